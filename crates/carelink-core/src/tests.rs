//! Service-level tests against in-memory doubles of every store.

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
  time::Duration as StdDuration,
};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
  Entity, Error,
  directory::PatientDirectory,
  gate::{AccessGate, AccessRequest, caregiver_verdict, patient_verdict},
  model::{AccountId, CreatedLink, Decision, Identity, Link, NoteRecord, PeerIndexEntry, Role},
  notes::NoteAccessService,
  registry::LinkRegistry,
  store::{ClinicalNoteStore, IdentityProvider, LinkStore, SecondaryIndex},
};

// ─── Doubles ─────────────────────────────────────────────────────────────────

fn id(s: &str) -> AccountId { AccountId::parse(s).unwrap() }

fn outage() -> Error {
  Error::transient(std::io::Error::other("store offline"))
}

/// Authoritative store double: accounts plus active links, guarded by one lock
/// so create/delete are atomic.
#[derive(Default)]
struct MemoryRegistry {
  accounts:    Mutex<BTreeMap<AccountId, Identity>>,
  links:       Mutex<BTreeMap<(AccountId, AccountId), Link>>,
  fail_reads:  AtomicBool,
  fail_delete: AtomicBool,
}

impl MemoryRegistry {
  fn with_accounts(accounts: &[(&str, Role)]) -> Self {
    let reg = Self::default();
    for (raw, role) in accounts {
      reg.accounts.lock().unwrap().insert(id(raw), Identity {
        id:    id(raw),
        email: format!("{raw}@example.com"),
        role:  *role,
      });
    }
    reg
  }

  fn link_count(&self) -> usize { self.links.lock().unwrap().len() }
}

impl IdentityProvider for MemoryRegistry {
  type Error = Error;

  async fn resolve(&self, id: &AccountId) -> Result<Option<Identity>, Error> {
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(outage());
    }
    Ok(self.accounts.lock().unwrap().get(id).cloned())
  }

  async fn resolve_by_email_fragment(
    &self,
    pattern: &str,
    role: Role,
    exclude: &BTreeSet<AccountId>,
    limit: usize,
  ) -> Result<Vec<Identity>, Error> {
    let pattern = pattern.to_lowercase();
    Ok(
      self
        .accounts
        .lock()
        .unwrap()
        .values()
        .filter(|i| i.role == role && !exclude.contains(&i.id))
        .filter(|i| i.email.to_lowercase().contains(&pattern))
        .take(limit)
        .cloned()
        .collect(),
    )
  }
}

impl LinkStore for MemoryRegistry {
  type Error = Error;

  async fn create_link(
    &self,
    caregiver_id: &AccountId,
    patient_id: &AccountId,
  ) -> Result<CreatedLink, Error> {
    let accounts = self.accounts.lock().unwrap();
    let mut links = self.links.lock().unwrap();

    let caregiver = accounts
      .get(caregiver_id)
      .filter(|i| i.role == Role::Caregiver)
      .cloned()
      .ok_or(Error::NotFound(Entity::Caregiver))?;
    let patient = accounts
      .get(patient_id)
      .filter(|i| i.role == Role::Patient)
      .cloned()
      .ok_or(Error::NotFound(Entity::Patient))?;

    let key = (caregiver_id.clone(), patient_id.clone());
    if links.contains_key(&key) {
      return Err(Error::AlreadyLinked);
    }
    let link = Link {
      link_id:      Uuid::new_v4(),
      caregiver_id: caregiver_id.clone(),
      patient_id:   patient_id.clone(),
      created_at:   Utc::now(),
      active:       true,
    };
    links.insert(key, link.clone());
    Ok(CreatedLink { link, caregiver, patient })
  }

  async fn delete_link(
    &self,
    caregiver_id: &AccountId,
    patient_id: &AccountId,
  ) -> Result<Link, Error> {
    if self.fail_delete.load(Ordering::SeqCst) {
      return Err(outage());
    }
    self
      .links
      .lock()
      .unwrap()
      .remove(&(caregiver_id.clone(), patient_id.clone()))
      .ok_or(Error::NotFound(Entity::Link))
  }

  async fn link_exists(
    &self,
    caregiver_id: &AccountId,
    patient_id: &AccountId,
  ) -> Result<bool, Error> {
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(outage());
    }
    Ok(
      self
        .links
        .lock()
        .unwrap()
        .get(&(caregiver_id.clone(), patient_id.clone()))
        .is_some_and(|l| l.active),
    )
  }

  async fn patients_of(&self, caregiver_id: &AccountId) -> Result<BTreeSet<AccountId>, Error> {
    Ok(
      self
        .links
        .lock()
        .unwrap()
        .keys()
        .filter(|(c, _)| c == caregiver_id)
        .map(|(_, p)| p.clone())
        .collect(),
    )
  }

  async fn caregivers_of(&self, patient_id: &AccountId) -> Result<BTreeSet<AccountId>, Error> {
    Ok(
      self
        .links
        .lock()
        .unwrap()
        .keys()
        .filter(|(_, p)| p == patient_id)
        .map(|(c, _)| c.clone())
        .collect(),
    )
  }
}

/// Peer index double with failure and latency injection.
#[derive(Default)]
struct MemoryIndex {
  entries:       Mutex<Vec<PeerIndexEntry>>,
  fail_mirror:   AtomicBool,
  fail_unmirror: AtomicBool,
  mirror_calls:  AtomicUsize,
  mirror_delay:  Mutex<Option<StdDuration>>,
}

impl SecondaryIndex for MemoryIndex {
  type Error = Error;

  async fn mirror(&self, entry: &PeerIndexEntry) -> Result<(), Error> {
    self.mirror_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *self.mirror_delay.lock().unwrap();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    if self.fail_mirror.load(Ordering::SeqCst) {
      return Err(outage());
    }
    self.entries.lock().unwrap().push(entry.clone());
    Ok(())
  }

  async fn unmirror(&self, caregiver_id: &AccountId, patient_id: &AccountId) -> Result<(), Error> {
    if self.fail_unmirror.load(Ordering::SeqCst) {
      return Err(outage());
    }
    self
      .entries
      .lock()
      .unwrap()
      .retain(|e| !(&e.caregiver_id == caregiver_id && &e.patient_id == patient_id));
    Ok(())
  }

  async fn query_by_caregiver(&self, caregiver_id: &AccountId) -> Result<BTreeSet<AccountId>, Error> {
    Ok(
      self
        .entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| &e.caregiver_id == caregiver_id)
        .map(|e| e.patient_id.clone())
        .collect(),
    )
  }

  async fn query_by_patient(&self, patient_id: &AccountId) -> Result<BTreeSet<AccountId>, Error> {
    Ok(
      self
        .entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| &e.patient_id == patient_id)
        .map(|e| e.caregiver_id.clone())
        .collect(),
    )
  }
}

/// Notes double that counts every call.
#[derive(Default)]
struct MemoryNotes {
  notes: Mutex<Vec<NoteRecord>>,
  calls: AtomicUsize,
}

impl MemoryNotes {
  fn add(&self, owner: &str, content: &str, created_at: DateTime<Utc>) {
    self.notes.lock().unwrap().push(NoteRecord {
      id: Uuid::new_v4(),
      owner_patient_id: id(owner),
      content: content.to_owned(),
      analysis: None,
      analyzed_at: None,
      created_at,
    });
  }

  fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl ClinicalNoteStore for MemoryNotes {
  type Error = Error;

  async fn list_by_owner(&self, patient_id: &AccountId) -> Result<Vec<NoteRecord>, Error> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(
      self
        .notes
        .lock()
        .unwrap()
        .iter()
        .filter(|n| &n.owner_patient_id == patient_id)
        .cloned()
        .collect(),
    )
  }

  async fn list_unanalyzed(&self, patient_id: &AccountId, limit: usize) -> Result<Vec<NoteRecord>, Error> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(
      self
        .notes
        .lock()
        .unwrap()
        .iter()
        .filter(|n| &n.owner_patient_id == patient_id && n.analysis.is_none())
        .take(limit)
        .cloned()
        .collect(),
    )
  }

  async fn set_analysis(&self, note_id: Uuid, text: String, analyzed_at: DateTime<Utc>) -> Result<(), Error> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let mut notes = self.notes.lock().unwrap();
    let note = notes.iter_mut().find(|n| n.id == note_id).ok_or(Error::Validation("no such note".into()))?;
    note.analysis = Some(text);
    note.analyzed_at = Some(analyzed_at);
    Ok(())
  }
}

struct Fixture {
  store:    Arc<MemoryRegistry>,
  index:    Arc<MemoryIndex>,
  notes:    Arc<MemoryNotes>,
  registry: LinkRegistry<MemoryRegistry, MemoryIndex>,
  gate:     AccessGate<MemoryRegistry, MemoryRegistry>,
  service:  NoteAccessService<MemoryRegistry, MemoryRegistry, MemoryNotes>,
}

fn fixture() -> Fixture {
  let store = Arc::new(MemoryRegistry::with_accounts(&[
    ("caregiver1", Role::Caregiver),
    ("caregiver2", Role::Caregiver),
    ("patient1", Role::Patient),
    ("patient2", Role::Patient),
  ]));
  let index = Arc::new(MemoryIndex::default());
  let notes = Arc::new(MemoryNotes::default());
  let gate = AccessGate::new(store.clone(), store.clone());
  Fixture {
    registry: LinkRegistry::new(store.clone(), index.clone()),
    service: NoteAccessService::new(gate.clone(), store.clone(), notes.clone()),
    gate,
    store,
    index,
    notes,
  }
}

async fn decide(f: &Fixture, requester: &str, role: Role, patient: &str) -> Decision {
  f.gate.decide(AccessRequest::new(requester, role, patient)).await.unwrap()
}

// ─── LinkRegistry ────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_exists_and_mirrors() {
  let f = fixture();
  let link = f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();

  assert!(link.active);
  assert_eq!(link.caregiver_id, id("caregiver1"));
  assert!(f.registry.exists(&id("caregiver1"), &id("patient1")).await.unwrap());

  let entries = f.index.entries.lock().unwrap().clone();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].linked_at, link.created_at);
  assert_eq!(entries[0].caregiver_email, "caregiver1@example.com");
  assert_eq!(entries[0].patient_email, "patient1@example.com");
}

#[tokio::test]
async fn second_create_reports_already_linked() {
  let f = fixture();
  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();

  let err = f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap_err();
  assert!(matches!(err, Error::AlreadyLinked));
  assert!(f.registry.exists(&id("caregiver1"), &id("patient1")).await.unwrap());
  assert_eq!(f.store.link_count(), 1);
  assert_eq!(f.index.mirror_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn self_link_rejected_before_store() {
  let f = fixture();
  let err = f.registry.create(&id("caregiver1"), &id("caregiver1")).await.unwrap_err();
  assert!(matches!(err, Error::SelfLink));
  assert_eq!(f.store.link_count(), 0);
}

#[tokio::test]
async fn create_with_wrong_roles_is_not_found() {
  let f = fixture();
  let err = f.registry.create(&id("patient1"), &id("patient2")).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(Entity::Caregiver)));

  let err = f.registry.create(&id("caregiver1"), &id("caregiver2")).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(Entity::Patient)));

  let err = f.registry.create(&id("ghost"), &id("patient1")).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(Entity::Caregiver)));
  assert_eq!(f.index.mirror_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn delete_removes_link_and_mirror() {
  let f = fixture();
  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();
  f.registry.delete(&id("caregiver1"), &id("patient1")).await.unwrap();

  assert!(!f.registry.exists(&id("caregiver1"), &id("patient1")).await.unwrap());
  assert!(f.index.entries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn delete_without_link_is_not_found() {
  let f = fixture();
  let err = f.registry.delete(&id("caregiver1"), &id("patient1")).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(Entity::Link)));
}

#[tokio::test]
async fn mirror_failure_compensates() {
  let f = fixture();
  f.index.fail_mirror.store(true, Ordering::SeqCst);

  let err = f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap_err();
  assert!(matches!(err, Error::Transient(_)));
  assert!(!f.registry.exists(&id("caregiver1"), &id("patient1")).await.unwrap());
  assert_eq!(f.store.link_count(), 0);

  // Once the mirror recovers, the same pair can be linked normally.
  f.index.fail_mirror.store(false, Ordering::SeqCst);
  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();
  assert!(f.registry.exists(&id("caregiver1"), &id("patient1")).await.unwrap());
}

#[tokio::test]
async fn failed_compensation_still_surfaces_one_failure() {
  let f = fixture();
  f.index.fail_mirror.store(true, Ordering::SeqCst);
  f.store.fail_delete.store(true, Ordering::SeqCst);

  let err = f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap_err();
  assert!(matches!(err, Error::Transient(_)));
}

#[tokio::test]
async fn abandoned_create_still_mirrors() {
  let f = fixture();
  *f.index.mirror_delay.lock().unwrap() = Some(StdDuration::from_millis(100));

  let abandoned = tokio::time::timeout(
    StdDuration::from_millis(10),
    f.registry.create(&id("caregiver1"), &id("patient1")),
  )
  .await;
  assert!(abandoned.is_err());

  tokio::time::sleep(StdDuration::from_millis(300)).await;
  assert!(f.registry.exists(&id("caregiver1"), &id("patient1")).await.unwrap());
  let mirrored = f.index.query_by_caregiver(&id("caregiver1")).await.unwrap();
  assert_eq!(mirrored, BTreeSet::from([id("patient1")]));
}

#[tokio::test]
async fn abandoned_create_still_compensates() {
  let f = fixture();
  *f.index.mirror_delay.lock().unwrap() = Some(StdDuration::from_millis(100));
  f.index.fail_mirror.store(true, Ordering::SeqCst);

  let abandoned = tokio::time::timeout(
    StdDuration::from_millis(10),
    f.registry.create(&id("caregiver1"), &id("patient1")),
  )
  .await;
  assert!(abandoned.is_err());

  tokio::time::sleep(StdDuration::from_millis(300)).await;
  assert_eq!(f.store.link_count(), 0);
  assert!(f.index.entries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unmirror_failure_does_not_fail_delete() {
  let f = fixture();
  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();
  f.index.fail_unmirror.store(true, Ordering::SeqCst);

  f.registry.delete(&id("caregiver1"), &id("patient1")).await.unwrap();
  assert!(!f.registry.exists(&id("caregiver1"), &id("patient1")).await.unwrap());

  // The stale mirror entry remains but grants nothing.
  assert_eq!(f.index.entries.lock().unwrap().len(), 1);
  assert_eq!(decide(&f, "caregiver1", Role::Caregiver, "patient1").await, Decision::Deny);
}

#[tokio::test]
async fn listings_follow_authoritative_store() {
  let f = fixture();
  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();
  f.registry.create(&id("caregiver1"), &id("patient2")).await.unwrap();
  f.registry.create(&id("caregiver2"), &id("patient1")).await.unwrap();

  let patients = f.registry.patients_of(&id("caregiver1")).await.unwrap();
  assert_eq!(patients, BTreeSet::from([id("patient1"), id("patient2")]));

  let caregivers = f.registry.caregivers_of(&id("patient1")).await.unwrap();
  assert_eq!(caregivers, BTreeSet::from([id("caregiver1"), id("caregiver2")]));
}

// ─── AccessGate ──────────────────────────────────────────────────────────────

#[test]
fn pure_verdicts() {
  let c = Identity { id: id("c"), email: "c@x".into(), role: Role::Caregiver };
  let p = Identity { id: id("p"), email: "p@x".into(), role: Role::Patient };

  assert_eq!(patient_verdict(&id("p"), &id("p")), Decision::Permit);
  assert_eq!(patient_verdict(&id("p"), &id("q")), Decision::Deny);
  assert_eq!(caregiver_verdict(Some(&c), Some(&p), true), Decision::Permit);
  assert_eq!(caregiver_verdict(Some(&c), Some(&p), false), Decision::Deny);
  assert_eq!(caregiver_verdict(Some(&p), Some(&p), true), Decision::Deny);
  assert_eq!(caregiver_verdict(Some(&c), Some(&c), true), Decision::Deny);
  assert_eq!(caregiver_verdict(None, Some(&p), true), Decision::Deny);
  assert_eq!(caregiver_verdict(Some(&c), None, true), Decision::Deny);
}

#[tokio::test]
async fn patient_always_reads_own_notes() {
  let f = fixture();
  assert_eq!(decide(&f, "patient1", Role::Patient, "patient1").await, Decision::Permit);
  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();
  assert_eq!(decide(&f, "patient1", Role::Patient, "patient1").await, Decision::Permit);
  assert_eq!(decide(&f, "patient1", Role::Patient, "patient2").await, Decision::Deny);
}

#[tokio::test]
async fn caregiver_decision_flips_with_link_state() {
  let f = fixture();
  assert_eq!(decide(&f, "caregiver1", Role::Caregiver, "patient1").await, Decision::Deny);

  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();
  assert_eq!(decide(&f, "caregiver1", Role::Caregiver, "patient1").await, Decision::Permit);
  assert_eq!(decide(&f, "caregiver2", Role::Caregiver, "patient1").await, Decision::Deny);

  f.registry.delete(&id("caregiver1"), &id("patient1")).await.unwrap();
  assert_eq!(decide(&f, "caregiver1", Role::Caregiver, "patient1").await, Decision::Deny);
}

#[tokio::test]
async fn gate_ignores_the_mirror() {
  let f = fixture();
  f.index.entries.lock().unwrap().push(PeerIndexEntry {
    caregiver_id:    id("caregiver1"),
    patient_id:      id("patient1"),
    linked_at:       Utc::now(),
    caregiver_email: "caregiver1@example.com".into(),
    patient_email:   "patient1@example.com".into(),
  });
  assert_eq!(decide(&f, "caregiver1", Role::Caregiver, "patient1").await, Decision::Deny);
}

#[tokio::test]
async fn asserted_role_must_match_identity() {
  let f = fixture();
  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();
  // A patient claiming to be a caregiver gets nothing.
  assert_eq!(decide(&f, "patient2", Role::Caregiver, "patient1").await, Decision::Deny);
  // Unknown accounts are denied, never treated as permitted.
  assert_eq!(decide(&f, "ghost", Role::Caregiver, "patient1").await, Decision::Deny);
  assert_eq!(decide(&f, "caregiver1", Role::Caregiver, "ghost").await, Decision::Deny);
}

#[tokio::test]
async fn missing_or_malformed_parameters_deny() {
  let f = fixture();
  let cases = [
    AccessRequest::default(),
    AccessRequest { requester_id: Some("caregiver1"), requester_role: None, patient_id: Some("patient1") },
    AccessRequest { requester_id: None, requester_role: Some(Role::Patient), patient_id: Some("patient1") },
    AccessRequest { requester_id: Some("patient1"), requester_role: Some(Role::Patient), patient_id: None },
    AccessRequest::new("", Role::Patient, ""),
    AccessRequest::new("patient 1", Role::Patient, "patient 1"),
  ];
  for request in cases {
    assert_eq!(f.gate.decide(request).await.unwrap(), Decision::Deny, "{request:?}");
  }
}

#[tokio::test]
async fn no_transitive_access() {
  let f = fixture();
  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();
  f.registry.create(&id("caregiver2"), &id("patient2")).await.unwrap();
  assert_eq!(decide(&f, "caregiver1", Role::Caregiver, "patient2").await, Decision::Deny);
}

#[tokio::test]
async fn lookup_outage_propagates_instead_of_permitting() {
  let f = fixture();
  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();
  f.store.fail_reads.store(true, Ordering::SeqCst);

  let result = f.gate.decide(AccessRequest::new("caregiver1", Role::Caregiver, "patient1")).await;
  assert!(matches!(result, Err(Error::Transient(_))));
}

// ─── NoteAccessService ───────────────────────────────────────────────────────

#[tokio::test]
async fn notes_are_returned_most_recent_first() {
  let f = fixture();
  let now = Utc::now();
  f.notes.add("patient1", "older", now - Duration::hours(2));
  f.notes.add("patient1", "newest", now);
  f.notes.add("patient1", "middle", now - Duration::hours(1));
  f.notes.add("patient2", "someone else", now);

  let notes = f.service.get_notes(AccessRequest::new("patient1", Role::Patient, "patient1")).await.unwrap();
  let contents: Vec<_> = notes.iter().map(|n| n.content.as_str()).collect();
  assert_eq!(contents, ["newest", "middle", "older"]);
}

#[tokio::test]
async fn linked_caregiver_reads_notes_unmodified() {
  let f = fixture();
  f.notes.add("patient1", "feeling better today", Utc::now());
  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();

  let notes = f.service.get_notes(AccessRequest::new("caregiver1", Role::Caregiver, "patient1")).await.unwrap();
  assert_eq!(notes.len(), 1);
  assert_eq!(notes[0].content, "feeling better today");
  assert_eq!(notes[0].analysis, None);
}

#[tokio::test]
async fn deny_never_touches_notes_store() {
  let f = fixture();
  f.notes.add("patient1", "private", Utc::now());

  let with_notes = f.service.get_notes(AccessRequest::new("caregiver1", Role::Caregiver, "patient1")).await;
  let without_notes = f.service.get_notes(AccessRequest::new("caregiver1", Role::Caregiver, "patient2")).await;

  assert!(matches!(with_notes, Err(Error::Deny)));
  assert!(matches!(without_notes, Err(Error::Deny)));
  assert_eq!(f.notes.calls(), 0);
}

#[tokio::test]
async fn unknown_patient_reading_self_is_not_found() {
  let f = fixture();
  let result = f.service.get_notes(AccessRequest::new("newcomer", Role::Patient, "newcomer")).await;
  assert!(matches!(result, Err(Error::NotFound(Entity::Patient))));
  assert_eq!(f.notes.calls(), 0);
}

#[tokio::test]
async fn example_walkthrough() {
  let f = fixture();
  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();
  assert_eq!(decide(&f, "caregiver1", Role::Caregiver, "patient1").await, Decision::Permit);
  f.registry.delete(&id("caregiver1"), &id("patient1")).await.unwrap();
  assert_eq!(decide(&f, "caregiver1", Role::Caregiver, "patient1").await, Decision::Deny);
  assert!(matches!(
    f.registry.create(&id("caregiver1"), &id("caregiver1")).await,
    Err(Error::SelfLink)
  ));
}

// ─── PatientDirectory ────────────────────────────────────────────────────────

#[tokio::test]
async fn available_patients_excludes_linked_and_caregivers() {
  let f = fixture();
  f.registry.create(&id("caregiver1"), &id("patient1")).await.unwrap();
  let directory = PatientDirectory::new(f.store.clone(), f.index.clone());

  let available = directory.available_patients(&id("caregiver1"), "").await.unwrap();
  let ids: Vec<_> = available.iter().map(|i| i.id.as_str()).collect();
  assert_eq!(ids, ["patient2"]);

  let none = directory.available_patients(&id("caregiver1"), "PATIENT1@").await.unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn caregivers_and_linked_patients_do_not_use_up_the_page() {
  let mut accounts: Vec<(String, Role)> =
    (0..25).map(|n| (format!("a{n:02}"), Role::Caregiver)).collect();
  accounts.extend((0..5).map(|n| (format!("b{n:02}"), Role::Patient)));
  accounts.push(("zed".to_owned(), Role::Patient));
  let refs: Vec<(&str, Role)> = accounts.iter().map(|(a, r)| (a.as_str(), *r)).collect();

  let store = Arc::new(MemoryRegistry::with_accounts(&refs));
  let index = Arc::new(MemoryIndex::default());
  let registry = LinkRegistry::new(store.clone(), index.clone());
  for n in 0..5 {
    registry.create(&id("a00"), &id(&format!("b{n:02}"))).await.unwrap();
  }

  let directory = PatientDirectory::new(store, index);
  let available = directory.available_patients(&id("a00"), "example").await.unwrap();
  let ids: Vec<_> = available.iter().map(|i| i.id.as_str()).collect();
  assert_eq!(ids, ["zed"]);
}
