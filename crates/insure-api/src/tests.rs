//! Service and router tests against an in-memory `SqliteStore`.

use std::sync::{Arc, Mutex};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::NaiveDate;
use insure_core::{
  Error,
  account::{CreateAccountOutcome, Credential, NewAccount},
  claim::{ClaimStatus, ClaimUpdate, NewClaim, TransitionPolicy},
  notify::{Message, NotificationPolicy, Notifier},
  person::{PersonId, PersonProfile},
  policy::InsuranceInput,
  role::{Caller, Role},
  store::{IdentityProvider as _, InsuranceStore as _},
};
use insure_store_sqlite::SqliteStore;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{
  AppState, Settings,
  error::ApiError,
  router,
  services::{
    accounts::{self, ConfirmEmail, ForgotPassword, ResetPassword},
    admin,
    claims::{self, ClaimEditRequest},
    participants, persons,
    persons::RegisterRequest,
    policies,
  },
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

const PASSWORD: &str = "Secret1!";

/// Captures every message instead of delivering it.
#[derive(Clone, Default)]
struct Recorder {
  sent: Arc<Mutex<Vec<Message>>>,
  fail: bool,
}

impl Recorder {
  fn failing() -> Self { Self { fail: true, ..Self::default() } }

  fn take(&self) -> Vec<Message> { std::mem::take(&mut *self.sent.lock().unwrap()) }
}

impl Notifier for Recorder {
  type Error = std::io::Error;

  async fn send(&self, message: Message) -> Result<(), Self::Error> {
    if self.fail {
      return Err(std::io::Error::other("relay unavailable"));
    }
    self.sent.lock().unwrap().push(message);
    Ok(())
  }
}

type State = AppState<SqliteStore, Recorder>;

async fn state_with(notifier: Recorder, configure: impl FnOnce(&mut Settings)) -> State {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let mut settings = Settings::new("http://insure.test/");
  configure(&mut settings);
  AppState::new(store, notifier, settings)
}

async fn state() -> (State, Recorder) {
  let recorder = Recorder::default();
  (state_with(recorder.clone(), |_| {}).await, recorder)
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

fn profile(name: &str) -> PersonProfile {
  PersonProfile {
    full_name:     name.into(),
    date_of_birth: day(1985, 5, 20),
    phone:         "+421 900 111 222".into(),
    street:        "Hlavna 1".into(),
    city:          "Kosice".into(),
    country:       "Slovakia".into(),
    post_code:     "040 01".into(),
  }
}

fn registration(name: &str, email: &str) -> RegisterRequest {
  RegisterRequest { profile: profile(name), email: email.into(), password: PASSWORD.into() }
}

async fn caller(state: &State, email: &str) -> Caller {
  let account = state
    .store
    .account_by_email(email.into())
    .await
    .unwrap()
    .expect("account exists");
  let roles = state.store.roles_of(account.id).await.unwrap();
  Caller {
    identity_id: account.id,
    email: account.email,
    full_name: account.full_name,
    roles,
  }
}

async fn staff(state: &State, email: &str, name: &str, role: Role) -> Caller {
  let outcome = state
    .store
    .create_account(NewAccount {
      email:           email.into(),
      full_name:       name.into(),
      credential:      Credential::Password(PASSWORD.into()),
      email_confirmed: true,
    })
    .await
    .unwrap();
  let CreateAccountOutcome::Created(account) = outcome else {
    panic!("{email} already exists");
  };
  state.store.add_role(account.id, role).await.unwrap();
  caller(state, email).await
}

/// Register a client and return their caller and person id.
async fn client(state: &State, name: &str, email: &str) -> (Caller, PersonId) {
  let person = persons::register(state, registration(name, email)).await.unwrap();
  (caller(state, email).await, person.id)
}

fn home(holder: PersonId) -> InsuranceInput {
  InsuranceInput {
    name:               "Home".into(),
    subject:            "Family house".into(),
    amount:             250_000,
    valid_from:         day(2024, 1, 1),
    valid_to:           day(2025, 1, 1),
    policy_holder_id:   holder,
    insured_person_ids: vec![],
  }
}

fn burst_pipe(insurance_id: i64) -> NewClaim {
  NewClaim {
    insurance_id,
    description: "Burst pipe in the kitchen".into(),
    occurred_on: day(2024, 3, 1),
    estimated_damage: Decimal::new(125_050, 2),
    status: Some(ClaimStatus::Complete),
  }
}

fn edit_to(status: ClaimStatus) -> ClaimEditRequest {
  ClaimEditRequest {
    update:  ClaimUpdate {
      description: "Burst pipe in the kitchen".into(),
      occurred_on: day(2024, 3, 1),
      estimated_damage: Decimal::new(125_050, 2),
      status,
    },
    version: None,
  }
}

/// `(account_id, token)` from the link embedded in a message body.
fn link_params(body: &str) -> (Uuid, String) {
  let start = body.find("account_id=").expect("link in body") + "account_id=".len();
  let (id, rest) = body[start..].split_once("&token=").expect("token in link");
  let end = rest.find('\'').expect("quoted href");
  (id.parse().unwrap(), rest[..end].to_owned())
}

fn recipients(messages: &[Message]) -> Vec<&str> {
  let mut to: Vec<&str> = messages.iter().map(|m| m.to.as_str()).collect();
  to.sort_unstable();
  to
}

// ─── Claims and notifications ────────────────────────────────────────────────

#[tokio::test]
async fn filing_forces_new_and_notifies_claimant_and_admins() {
  let (state, outbox) = state().await;
  let _admin = staff(&state, "a1@insure.test", "Ada Admin", Role::Admin).await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (jana, jana_id) = client(&state, "Jana", "jana@example.com").await;
  outbox.take();

  let policy = policies::create(&state, &agent, home(jana_id)).await.unwrap();
  let claim = claims::create(&state, &jana, burst_pipe(policy.insurance.id)).await.unwrap();
  assert_eq!(claim.status, ClaimStatus::New);
  assert_eq!(claim.person_id, jana_id);

  let sent = outbox.take();
  assert_eq!(recipients(&sent), ["a1@insure.test", "jana@example.com"]);
  let admin_msg = sent.iter().find(|m| m.to == "a1@insure.test").unwrap();
  assert_eq!(admin_msg.subject, "A new incident");
  assert!(admin_msg.body_html.contains("for customer Jana"));
}

#[tokio::test]
async fn agent_status_change_notifies_claimant_and_admins() {
  let (state, outbox) = state().await;
  staff(&state, "a1@insure.test", "Ada Admin", Role::Admin).await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (_, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let policy = policies::create(&state, &agent, home(jana_id)).await.unwrap();
  let claim = claims::create(&state, &agent, burst_pipe(policy.insurance.id)).await.unwrap();
  outbox.take();

  let after = claims::edit(&state, &agent, claim.id, edit_to(ClaimStatus::InProgress))
    .await
    .unwrap();
  assert_eq!(after.status, ClaimStatus::InProgress);
  assert_eq!(after.version, claim.version + 1);

  let sent = outbox.take();
  assert_eq!(recipients(&sent), ["a1@insure.test", "jana@example.com"]);
  let to_admin = sent.iter().find(|m| m.to == "a1@insure.test").unwrap();
  assert!(to_admin.body_html.contains("Agent Alex Agent"));
  let to_claimant = sent.iter().find(|m| m.to == "jana@example.com").unwrap();
  assert_eq!(to_claimant.subject, "Change incident status");
}

#[tokio::test]
async fn admin_status_change_notifies_only_claimant() {
  let (state, outbox) = state().await;
  let admin = staff(&state, "a1@insure.test", "Ada Admin", Role::Admin).await;
  let (_, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let policy = policies::create(&state, &admin, home(jana_id)).await.unwrap();
  let claim = claims::create(&state, &admin, burst_pipe(policy.insurance.id)).await.unwrap();
  outbox.take();

  claims::edit(&state, &admin, claim.id, edit_to(ClaimStatus::Complete)).await.unwrap();
  assert_eq!(recipients(&outbox.take()), ["jana@example.com"]);
}

#[tokio::test]
async fn unchanged_status_sends_nothing() {
  let (state, outbox) = state().await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (_, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let policy = policies::create(&state, &agent, home(jana_id)).await.unwrap();
  let claim = claims::create(&state, &agent, burst_pipe(policy.insurance.id)).await.unwrap();
  outbox.take();

  let mut request = edit_to(ClaimStatus::New);
  request.update.description = "Burst pipe, water in the cellar".into();
  claims::edit(&state, &agent, claim.id, request).await.unwrap();
  assert!(outbox.take().is_empty());
}

#[tokio::test]
async fn forward_only_rejects_backward_moves() {
  let recorder = Recorder::default();
  let state = state_with(recorder, |s| s.transition_policy = TransitionPolicy::ForwardOnly).await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (_, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let policy = policies::create(&state, &agent, home(jana_id)).await.unwrap();
  let claim = claims::create(&state, &agent, burst_pipe(policy.insurance.id)).await.unwrap();

  claims::edit(&state, &agent, claim.id, edit_to(ClaimStatus::Complete)).await.unwrap();
  let err = claims::edit(&state, &agent, claim.id, edit_to(ClaimStatus::New))
    .await
    .unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::Validation(ref f)) if f.has("status")));
}

#[tokio::test]
async fn stale_claim_version_conflicts() {
  let (state, _) = state().await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (_, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let policy = policies::create(&state, &agent, home(jana_id)).await.unwrap();
  let claim = claims::create(&state, &agent, burst_pipe(policy.insurance.id)).await.unwrap();
  claims::edit(&state, &agent, claim.id, edit_to(ClaimStatus::InProgress)).await.unwrap();

  let mut stale = edit_to(ClaimStatus::Complete);
  stale.version = Some(claim.version);
  let err = claims::edit(&state, &agent, claim.id, stale).await.unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::ConcurrencyConflict { .. })));
}

#[tokio::test]
async fn clients_cannot_edit_or_delete_claims() {
  let (state, _) = state().await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (jana, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let policy = policies::create(&state, &agent, home(jana_id)).await.unwrap();
  let claim = claims::create(&state, &jana, burst_pipe(policy.insurance.id)).await.unwrap();

  let err = claims::edit(&state, &jana, claim.id, edit_to(ClaimStatus::Complete))
    .await
    .unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::Forbidden(_))));
  let err = claims::delete(&state, &jana, claim.id).await.unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::Forbidden(_))));

  claims::delete(&state, &agent, claim.id).await.unwrap();
  claims::delete(&state, &agent, claim.id).await.unwrap();
}

#[tokio::test]
async fn isolated_notification_failure_keeps_the_claim() {
  let state = state_with(Recorder::failing(), |_| {}).await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let person = state.store.insert_person(profile("Jana"), None).await.unwrap();
  staff(&state, "a1@insure.test", "Ada Admin", Role::Admin).await;
  let policy = policies::create(&state, &agent, home(person.id)).await.unwrap();

  let claim = claims::create(&state, &agent, burst_pipe(policy.insurance.id)).await.unwrap();
  assert!(state.store.get_claim(claim.id).await.unwrap().is_some());
}

#[tokio::test]
async fn propagated_notification_failure_surfaces_after_commit() {
  let state =
    state_with(Recorder::failing(), |s| s.notification_policy = NotificationPolicy::Propagate)
      .await;

  let err = persons::register(&state, registration("Jana", "jana@example.com"))
    .await
    .unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::Notification { .. })));
  assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

  // The registration itself committed.
  let account = state.store.account_by_email("jana@example.com".into()).await.unwrap();
  assert!(account.is_some());
}

// ─── Scope ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn clients_only_see_their_own_records() {
  let (state, _) = state().await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (jana, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let (_, petr_id) = client(&state, "Petr", "petr@example.com").await;

  let janas = policies::create(&state, &agent, home(jana_id)).await.unwrap();
  let petrs = policies::create(&state, &agent, home(petr_id)).await.unwrap();
  let petr_claim = claims::create(&state, &agent, burst_pipe(petrs.insurance.id)).await.unwrap();

  let visible = persons::list(&state, &jana).await.unwrap();
  assert_eq!(visible.iter().map(|p| p.id).collect::<Vec<_>>(), [jana_id]);
  let visible = policies::list(&state, &jana).await.unwrap();
  assert_eq!(visible.len(), 1);
  assert_eq!(visible[0].insurance.id, janas.insurance.id);
  assert!(claims::list(&state, &jana, None).await.unwrap().is_empty());

  let hidden = persons::details(&state, &jana, petr_id).await.unwrap_err();
  assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
  let hidden = policies::details(&state, &jana, petrs.insurance.id).await.unwrap_err();
  assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
  let hidden = claims::details(&state, &jana, petr_claim.id).await.unwrap_err();
  assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

  // Filing against someone else's policy looks like a missing policy.
  let err = claims::create(&state, &jana, burst_pipe(petrs.insurance.id)).await.unwrap_err();
  assert_eq!(err.status(), StatusCode::NOT_FOUND);

  let own = participants::list(&state, &jana, Default::default()).await.unwrap();
  assert!(own.iter().all(|p| p.insurance_id == janas.insurance.id));
  assert_eq!(
    participants::list(&state, &agent, Default::default()).await.unwrap().len(),
    2
  );
}

#[tokio::test]
async fn client_without_profile_is_unauthorized() {
  let (state, _) = state().await;
  let orphan = staff(&state, "orphan@example.com", "Orphan", Role::Client).await;
  let err = persons::list(&state, &orphan).await.unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::Unauthorized)));
}

#[tokio::test]
async fn client_may_edit_own_profile_only() {
  let (state, _) = state().await;
  let (jana, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let (_, petr_id) = client(&state, "Petr", "petr@example.com").await;

  let mut own = persons::PersonUpdate { profile: profile("Jana Novakova"), version: None };
  let updated = persons::update(&state, &jana, jana_id, own.clone()).await.unwrap();
  assert_eq!(updated.profile.full_name, "Jana Novakova");
  assert_eq!(updated.identity_id, Some(jana.identity_id));

  own.version = Some(1);
  let err = persons::update(&state, &jana, jana_id, own).await.unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::ConcurrencyConflict { .. })));

  let foreign = persons::PersonUpdate { profile: profile("Mallory"), version: None };
  let err = persons::update(&state, &jana, petr_id, foreign).await.unwrap_err();
  assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

// ─── Policies ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn policy_writes_are_staff_only() {
  let (state, _) = state().await;
  let (jana, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let err = policies::create(&state, &jana, home(jana_id)).await.unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::Forbidden(_))));
}

#[tokio::test]
async fn unknown_persons_fail_validation() {
  let (state, _) = state().await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let mut input = home(404);
  input.insured_person_ids = vec![405];
  input.amount = 0;

  let err = policies::create(&state, &agent, input).await.unwrap_err();
  let fields = match err {
    ApiError::Core(Error::Validation(fields)) => fields,
    other => panic!("expected validation error, got {other:?}"),
  };
  assert!(fields.has("policy_holder_id"));
  assert!(fields.has("insured_person_ids"));
  assert!(fields.has("amount"));
}

#[tokio::test]
async fn referenced_policy_cannot_be_deleted() {
  let (state, _) = state().await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (_, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let policy = policies::create(&state, &agent, home(jana_id)).await.unwrap();
  claims::create(&state, &agent, burst_pipe(policy.insurance.id)).await.unwrap();

  let err = policies::delete(&state, &agent, policy.insurance.id).await.unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::ReferentialIntegrity { .. })));
  assert_eq!(err.status(), StatusCode::CONFLICT);

  let err = policies::delete(&state, &agent, 9_999).await.unwrap_err();
  assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn policy_without_claims_is_still_held_by_its_holder() {
  let (state, _) = state().await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (_, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let policy = policies::create(&state, &agent, home(jana_id)).await.unwrap();

  let err = policies::delete(&state, &agent, policy.insurance.id).await.unwrap_err();
  assert!(matches!(
    err,
    ApiError::Core(Error::ReferentialIntegrity { ref dependents, .. })
      if dependents == "0 claim(s) and 1 participant(s)"
  ));

  persons::delete(&state, &agent, jana_id).await.unwrap();
  assert!(state.store.get_policy(policy.insurance.id).await.unwrap().is_none());
}

#[tokio::test]
async fn policy_detail_includes_claims() {
  let (state, _) = state().await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (jana, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let policy = policies::create(&state, &agent, home(jana_id)).await.unwrap();
  let claim = claims::create(&state, &jana, burst_pipe(policy.insurance.id)).await.unwrap();

  let detail = policies::details(&state, &jana, policy.insurance.id).await.unwrap();
  assert_eq!(detail.claims.iter().map(|c| c.id).collect::<Vec<_>>(), [claim.id]);
  assert_eq!(detail.record.policy_holder().unwrap().person_id, jana_id);
}

#[tokio::test]
async fn holder_change_keeps_policy_with_its_owner() {
  let (state, _) = state().await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (jana, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let (petr, petr_id) = client(&state, "Petr", "petr@example.com").await;
  let policy = policies::create(&state, &agent, home(jana_id)).await.unwrap();
  let id = policy.insurance.id;
  let claim = claims::create(&state, &jana, burst_pipe(id)).await.unwrap();

  let edit = policies::PolicyUpdate { input: home(petr_id), version: None };
  let updated = policies::update(&state, &agent, id, edit).await.unwrap();
  assert_eq!(updated.policy_holder().unwrap().person_id, petr_id);
  assert_eq!(updated.insurance.person_id, jana_id);

  assert_eq!(policies::list(&state, &jana).await.unwrap().len(), 1);
  assert_eq!(claims::list(&state, &jana, None).await.unwrap().len(), 1);
  let detail = policies::details(&state, &jana, id).await.unwrap();
  assert_eq!(detail.claims.iter().map(|c| c.id).collect::<Vec<_>>(), [claim.id]);
  assert!(policies::list(&state, &petr).await.unwrap().is_empty());

  persons::delete(&state, &agent, petr_id).await.unwrap();
  assert!(state.store.get_claim(claim.id).await.unwrap().is_some());
  assert!(state.store.get_policy(id).await.unwrap().is_some());
}

// ─── Persons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_registration_leaves_no_orphans() {
  let (state, outbox) = state().await;
  client(&state, "Jana", "jana@example.com").await;
  outbox.take();

  let err = persons::register(&state, registration("Impostor", "JANA@example.com"))
    .await
    .unwrap_err();
  assert_eq!(err.status(), StatusCode::CONFLICT);
  assert_eq!(state.store.list_persons(None).await.unwrap().len(), 1);
  assert!(outbox.take().is_empty());
}

#[tokio::test]
async fn staff_create_sends_no_confirmation() {
  let (state, outbox) = state().await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (jana, _) = client(&state, "Jana", "jana@example.com").await;
  outbox.take();

  let person = persons::staff_create(&state, &agent, registration("Petr", "petr@example.com"))
    .await
    .unwrap();
  assert!(person.identity_id.is_some());
  assert!(outbox.take().is_empty());
  let petr = caller(&state, "petr@example.com").await;
  assert!(petr.roles.contains(Role::Client));

  let err = persons::staff_create(&state, &jana, registration("Eve", "eve@example.com"))
    .await
    .unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::Forbidden(_))));
}

#[tokio::test]
async fn staff_delete_cascades_to_identity() {
  let (state, _) = state().await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (jana, jana_id) = client(&state, "Jana", "jana@example.com").await;
  let policy = policies::create(&state, &agent, home(jana_id)).await.unwrap();
  claims::create(&state, &jana, burst_pipe(policy.insurance.id)).await.unwrap();

  let err = persons::delete(&state, &jana, jana_id).await.unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::Forbidden(_))));

  let plan = persons::delete(&state, &agent, jana_id).await.unwrap();
  assert!(!plan.steps.is_empty());
  assert!(state.store.get_person(jana_id).await.unwrap().is_none());
  assert!(state.store.get_policy(policy.insurance.id).await.unwrap().is_none());
  assert!(state.store.account(jana.identity_id).await.unwrap().is_none());

  let err = persons::delete(&state, &agent, jana_id).await.unwrap_err();
  assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn confirmation_link_confirms_once() {
  let (state, outbox) = state().await;
  persons::register(&state, registration("Jana", "jana@example.com")).await.unwrap();

  let sent = outbox.take();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].to, "jana@example.com");
  assert!(sent[0].body_html.contains("http://insure.test/account/confirm?account_id="));
  let (account_id, token) = link_params(&sent[0].body_html);

  accounts::confirm_email(&state, ConfirmEmail { account_id, token: token.clone() })
    .await
    .unwrap();
  let account = state.store.account(account_id).await.unwrap().unwrap();
  assert!(account.email_confirmed);

  let err = accounts::confirm_email(&state, ConfirmEmail { account_id, token }).await.unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::InvalidToken)));
}

#[tokio::test]
async fn forgot_password_is_silent_until_confirmed() {
  let (state, outbox) = state().await;
  persons::register(&state, registration("Jana", "jana@example.com")).await.unwrap();
  let confirm = outbox.take();

  let unknown = ForgotPassword { email: "nobody@example.com".into() };
  accounts::forgot_password(&state, unknown).await.unwrap();
  let unconfirmed = ForgotPassword { email: "jana@example.com".into() };
  accounts::forgot_password(&state, unconfirmed).await.unwrap();
  assert!(outbox.take().is_empty());

  let (account_id, token) = link_params(&confirm[0].body_html);
  accounts::confirm_email(&state, ConfirmEmail { account_id, token }).await.unwrap();

  let request = ForgotPassword { email: "jana@example.com".into() };
  accounts::forgot_password(&state, request).await.unwrap();
  let sent = outbox.take();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].subject, "Reset Password");
  let (account_id, token) = link_params(&sent[0].body_html);

  let weak = ResetPassword { account_id, token: token.clone(), password: "short".into() };
  let err = accounts::reset_password(&state, weak).await.unwrap_err();
  assert_eq!(err.status(), StatusCode::BAD_REQUEST);

  let reset = ResetPassword { account_id, token, password: "Changed2?".into() };
  accounts::reset_password(&state, reset).await.unwrap();
  let login = state
    .store
    .authenticate("jana@example.com".into(), "Changed2?".into())
    .await
    .unwrap();
  assert!(login.is_some());
}

#[tokio::test]
async fn change_password_requires_old_password() {
  let (state, _) = state().await;
  let (jana, _) = client(&state, "Jana", "jana@example.com").await;

  let wrong = accounts::ChangePassword {
    old_password: "Wrong1!".into(),
    new_password: "Changed2?".into(),
  };
  let err = accounts::change_password(&state, &jana, wrong).await.unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::InvalidCredentials)));

  let right = accounts::ChangePassword {
    old_password: PASSWORD.into(),
    new_password: "Changed2?".into(),
  };
  accounts::change_password(&state, &jana, right).await.unwrap();
}

#[tokio::test]
async fn admins_manage_roles() {
  let (state, _) = state().await;
  let admin = staff(&state, "a1@insure.test", "Ada Admin", Role::Admin).await;
  let agent = staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  let (jana, _) = client(&state, "Jana", "jana@example.com").await;

  let err = admin::list_users(&state, &agent).await.unwrap_err();
  assert!(matches!(err, ApiError::Core(Error::Forbidden(_))));

  let users = admin::list_users(&state, &admin).await.unwrap();
  assert_eq!(users.len(), 3);

  let changed = admin::change_role(&state, &admin, jana.identity_id, Role::Agent).await.unwrap();
  assert!(changed.roles.contains(Role::Agent));
  assert!(!changed.roles.contains(Role::Client));
  let jana = caller(&state, "jana@example.com").await;
  assert!(jana.is_staff());

  let err = admin::change_role(&state, &admin, Uuid::new_v4(), Role::Agent).await.unwrap_err();
  assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

// ─── Router ──────────────────────────────────────────────────────────────────

fn basic(user: &str, pass: &str) -> String {
  format!("Basic {}", B64.encode(format!("{user}:{pass}")))
}

async fn body_json(res: axum::response::Response) -> Value {
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_string()))
    .unwrap()
}

#[tokio::test]
async fn routes_require_credentials() {
  let (state, _) = state().await;
  let res = router(state)
    .oneshot(Request::builder().uri("/persons").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn register_then_fetch_own_profile() {
  let (state, _) = state().await;
  let app = router(state);

  let body = json!({
    "full_name": "Jana Novakova",
    "date_of_birth": "1990-04-12",
    "email": "jana@example.com",
    "password": PASSWORD,
  });
  let res = app.clone().oneshot(post_json("/register", &body)).await.unwrap();
  assert_eq!(res.status(), StatusCode::CREATED);
  let created = body_json(res).await;
  assert_eq!(created["full_name"], "Jana Novakova");

  let req = Request::builder()
    .uri("/persons/me")
    .header(header::AUTHORIZATION, basic("jana@example.com", PASSWORD))
    .body(Body::empty())
    .unwrap();
  let res = app.oneshot(req).await.unwrap();
  assert_eq!(res.status(), StatusCode::OK);
  let me = body_json(res).await;
  assert_eq!(me["id"], created["id"]);
}

#[tokio::test]
async fn validation_errors_list_fields() {
  let (state, _) = state().await;
  let body = json!({
    "full_name": "",
    "date_of_birth": "1990-04-12",
    "email": "not-an-email",
    "password": "weak",
  });
  let res = router(state).oneshot(post_json("/register", &body)).await.unwrap();
  assert_eq!(res.status(), StatusCode::BAD_REQUEST);

  let json = body_json(res).await;
  let fields: Vec<&str> = json["fields"]
    .as_array()
    .unwrap()
    .iter()
    .map(|f| f["field"].as_str().unwrap())
    .collect();
  assert!(fields.contains(&"full_name"));
  assert!(fields.contains(&"email"));
  assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn forgot_password_is_accepted_anonymously() {
  let (state, _) = state().await;
  let body = json!({ "email": "nobody@example.com" });
  let res = router(state)
    .oneshot(post_json("/account/forgot-password", &body))
    .await
    .unwrap();
  assert_eq!(res.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn report_is_staff_only_over_http() {
  let (state, _) = state().await;
  staff(&state, "agent@insure.test", "Alex Agent", Role::Agent).await;
  client(&state, "Jana", "jana@example.com").await;
  let app = router(state);

  let as_client = Request::builder()
    .uri("/participants/report")
    .header(header::AUTHORIZATION, basic("jana@example.com", PASSWORD))
    .body(Body::empty())
    .unwrap();
  assert_eq!(app.clone().oneshot(as_client).await.unwrap().status(), StatusCode::FORBIDDEN);

  let as_agent = Request::builder()
    .uri("/participants/report")
    .header(header::AUTHORIZATION, basic("agent@insure.test", PASSWORD))
    .body(Body::empty())
    .unwrap();
  let res = app.oneshot(as_agent).await.unwrap();
  assert_eq!(res.status(), StatusCode::OK);
  assert_eq!(body_json(res).await, json!([]));
}

// ─── Registration rollback ───────────────────────────────────────────────────

mod rollback {
  use insure_core::{
    account::{Account, TokenPurpose},
    cascade::DeletionPlan,
    claim::{Claim, ClaimEdit, ClaimId, ClaimRecord},
    person::Person,
    policy::{
      InsuranceId, Participant, ParticipantFilter, ParticipantId, ParticipantReportRow,
      PolicyRecord,
    },
    role::RoleSet,
    store::{DeleteOutcome, IdentityProvider, InsuranceStore, UpdateOutcome},
  };

  use super::*;

  #[derive(Debug, thiserror::Error)]
  enum FaultError {
    #[error(transparent)]
    Store(#[from] insure_store_sqlite::Error),
    #[error("injected {0} failure")]
    Injected(&'static str),
  }

  /// `SqliteStore` with one write forced to fail.
  #[derive(Clone)]
  struct Faulty {
    inner:              SqliteStore,
    fail_insert_person: bool,
    fail_add_role:      bool,
  }

  macro_rules! delegate {
    ($($name:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*) => {
      $(
        async fn $name(&self, $($arg: $ty),*) -> Result<$ret, FaultError> {
          Ok(self.inner.$name($($arg),*).await?)
        }
      )*
    };
  }

  impl InsuranceStore for Faulty {
    type Error = FaultError;

    async fn insert_person(
      &self,
      profile: PersonProfile,
      identity_id: Option<Uuid>,
    ) -> Result<Person, FaultError> {
      if self.fail_insert_person {
        return Err(FaultError::Injected("insert_person"));
      }
      Ok(self.inner.insert_person(profile, identity_id).await?)
    }

    delegate! {
      get_person(id: PersonId) -> Option<Person>;
      person_by_identity(identity_id: Uuid) -> Option<Person>;
      list_persons(owner: Option<PersonId>) -> Vec<Person>;
      missing_persons(ids: Vec<PersonId>) -> Vec<PersonId>;
      update_person(id: PersonId, profile: PersonProfile, expected_version: i64)
        -> UpdateOutcome<Person>;
      delete_person_cascade(id: PersonId) -> Option<DeletionPlan>;
      create_insurance(input: InsuranceInput) -> PolicyRecord;
      get_policy(id: InsuranceId) -> Option<PolicyRecord>;
      list_policies(owner: Option<PersonId>) -> Vec<PolicyRecord>;
      update_insurance(id: InsuranceId, input: InsuranceInput, expected_version: i64)
        -> UpdateOutcome<PolicyRecord>;
      delete_insurance(id: InsuranceId) -> DeleteOutcome;
      list_participants(filter: ParticipantFilter) -> Vec<Participant>;
      get_participant(id: ParticipantId) -> Option<Participant>;
      participant_report() -> Vec<ParticipantReportRow>;
      insert_claim(record: ClaimRecord) -> Claim;
      get_claim(id: ClaimId) -> Option<Claim>;
      list_claims(owner: Option<PersonId>, insurance: Option<InsuranceId>) -> Vec<Claim>;
      update_claim(id: ClaimId, update: ClaimUpdate, expected_version: i64)
        -> UpdateOutcome<ClaimEdit>;
      delete_claim(id: ClaimId) -> bool;
    }
  }

  impl IdentityProvider for Faulty {
    type Error = FaultError;

    async fn add_role(&self, id: Uuid, role: Role) -> Result<(), FaultError> {
      if self.fail_add_role {
        return Err(FaultError::Injected("add_role"));
      }
      Ok(self.inner.add_role(id, role).await?)
    }

    delegate! {
      authenticate(email: String, password: String) -> Option<Account>;
      account(id: Uuid) -> Option<Account>;
      account_by_email(email: String) -> Option<Account>;
      list_accounts() -> Vec<Account>;
      create_account(new: NewAccount) -> CreateAccountOutcome;
      delete_account(id: Uuid) -> bool;
      roles_of(id: Uuid) -> RoleSet;
      set_roles(id: Uuid, roles: RoleSet) -> ();
      accounts_in_role(role: Role) -> Vec<Account>;
      change_password(id: Uuid, old: String, new: String) -> bool;
      issue_token(id: Uuid, purpose: TokenPurpose) -> String;
      confirm_email_with_token(id: Uuid, token: String) -> bool;
      reset_password_with_token(id: Uuid, token: String, new_password: String) -> bool;
    }
  }

  async fn faulty(fail_insert_person: bool, fail_add_role: bool) -> AppState<Faulty, Recorder> {
    let store = Faulty {
      inner: SqliteStore::open_in_memory().await.unwrap(),
      fail_insert_person,
      fail_add_role,
    };
    AppState::new(store, Recorder::default(), Settings::new("http://insure.test/"))
  }

  async fn assert_rolled_back(state: &AppState<Faulty, Recorder>) {
    let inner = &state.store.inner;
    assert!(inner.account_by_email("jana@example.com".into()).await.unwrap().is_none());
    assert!(inner.list_accounts().await.unwrap().is_empty());
    assert!(inner.list_persons(None).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn failed_person_insert_removes_account() {
    let state = faulty(true, false).await;

    let err = persons::register(&state, registration("Jana", "jana@example.com"))
      .await
      .unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_rolled_back(&state).await;
    assert!(state.notifier.take().is_empty());
  }

  #[tokio::test]
  async fn failed_role_grant_removes_account() {
    let state = faulty(false, true).await;

    let err = persons::register(&state, registration("Jana", "jana@example.com"))
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Store(_)));
    assert_rolled_back(&state).await;
  }

  #[tokio::test]
  async fn email_is_free_again_after_rollback() {
    let mut state = faulty(true, false).await;
    persons::register(&state, registration("Jana", "jana@example.com"))
      .await
      .unwrap_err();

    let mut store = (*state.store).clone();
    store.fail_insert_person = false;
    state = AppState::new(store, Recorder::default(), Settings::new("http://insure.test/"));

    let person = persons::register(&state, registration("Jana", "jana@example.com"))
      .await
      .unwrap();
    let account = state
      .store
      .inner
      .account_by_email("jana@example.com".into())
      .await
      .unwrap()
      .expect("account recreated");
    assert_eq!(person.identity_id, Some(account.id));
    assert!(state.store.inner.roles_of(account.id).await.unwrap().contains(Role::Client));
  }
}
