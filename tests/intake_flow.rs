//! End-to-end intake conversations against the in-memory adapters.
//!
//! Drives `IntakeService` through its public command API only, the way a
//! transport would, with stubbed gateway and reporting backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use casework::adapters::memory::{InMemoryCaseStore, InMemorySessionStore};
use casework::application::{Command, IntakeService};
use casework::domain::foundation::UserId;
use casework::domain::registry::poultry_registry;
use casework::ports::{
    CaseReport, CaseReporter, CaseSnapshot, CaseStore, Notifier, RemoteCheck, RemoteValidator,
    ReportError, Verdict,
};

struct StubGateway {
    verdict: Verdict,
    calls: AtomicUsize,
}

impl StubGateway {
    fn accepting() -> Self {
        Self {
            verdict: Verdict::Accepted,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_verdict(verdict: Verdict) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteValidator for StubGateway {
    async fn check(&self, _request: RemoteCheck) -> Verdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict.clone()
    }
}

struct StubReporter;

#[async_trait]
impl CaseReporter for StubReporter {
    async fn generate(&self, snapshot: &CaseSnapshot) -> Result<CaseReport, ReportError> {
        Ok(CaseReport {
            case_id: snapshot.case_id,
            summary: "Suspected respiratory outbreak".to_string(),
            body: "Full report body".to_string(),
        })
    }
}

struct CountingNotifier {
    sent: AtomicUsize,
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn escalate(&self, _report: &CaseReport) -> Result<(), ReportError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    service: IntakeService,
    cases: Arc<InMemoryCaseStore>,
    gateway: Arc<StubGateway>,
    notifier: Arc<CountingNotifier>,
}

impl Harness {
    fn new(gateway: StubGateway) -> Self {
        let cases = Arc::new(InMemoryCaseStore::new(poultry_registry()));
        let gateway = Arc::new(gateway);
        let notifier = Arc::new(CountingNotifier {
            sent: AtomicUsize::new(0),
        });
        let service = IntakeService::new(
            poultry_registry(),
            Arc::new(InMemorySessionStore::new()),
            cases.clone(),
            gateway.clone(),
            Arc::new(StubReporter),
            notifier.clone(),
        );
        Self {
            service,
            cases,
            gateway,
            notifier,
        }
    }

    async fn answer(&self, user: &UserId, question: &str, answer: &str) -> String {
        self.service
            .handle(user, Command::SelectQuestion(question.to_string()))
            .await
            .unwrap();
        self.service
            .handle(user, Command::SubmitAnswer(answer.to_string()))
            .await
            .unwrap()
            .text
    }

    async fn fill_form(&self, user: &UserId, form: &str, answers: &[(&str, &str)]) {
        self.service
            .handle(user, Command::SelectForm(form.to_string()))
            .await
            .unwrap();
        for (question, answer) in answers {
            self.answer(user, question, answer).await;
        }
        self.service.handle(user, Command::BackToForms).await.unwrap();
    }

    async fn fill_everything(&self, user: &UserId) {
        self.fill_form(
            user,
            "flock_farm_information",
            &[
                ("Type of Chicken", "Layer"),
                ("Age of Chicken", "34"),
                ("Housing Type", "Closed House"),
                ("Number of Affected Flocks/Houses", "3"),
                ("Feed Type", "Complete Feed"),
                ("Environment Information", "Hot and humid week, heavy rain"),
            ],
        )
        .await;
        self.fill_form(
            user,
            "symptoms_performance_data",
            &[
                ("Main Symptoms", "Coughing, swollen heads, greenish droppings"),
                ("Daily Production Performance", "Egg production dropped from 90% to 70%"),
                ("Pattern of Spread or Drop", "Spreading from house 2 to house 3"),
            ],
        )
        .await;
        self.fill_form(
            user,
            "medical_diagnostic_records",
            &[
                ("Vaccination History", "ND vaccine at day 1 and day 18"),
                ("Lab Data", "Pending serology results"),
                ("Pathology Findings (Necropsy)", "Tracheal hemorrhage in two birds"),
                ("Current Treatment", "Vitamin supplementation in water"),
                ("Management Questions", "Should we cull the affected house?"),
            ],
        )
        .await;
    }
}

fn farmer() -> UserId {
    UserId::new("farmer-7").unwrap()
}

#[tokio::test]
async fn complete_case_is_submitted_and_escalated_once() {
    let h = Harness::new(StubGateway::accepting());
    let user = farmer();

    let reply = h.service.handle(&user, Command::StartOrResume).await.unwrap();
    assert!(reply.text.contains("Starting new case"));
    assert_eq!(reply.options.len(), 3);

    h.fill_everything(&user).await;

    // Submission is requested from within a form's checklist.
    h.service
        .handle(&user, Command::SelectForm("medical_diagnostic_records".to_string()))
        .await
        .unwrap();
    let reply = h.service.handle(&user, Command::SubmitCase).await.unwrap();
    assert!(reply.text.contains("Submit case"));
    assert_eq!(reply.options, vec!["Yes", "No"]);

    let reply = h.service.handle(&user, Command::Confirm).await.unwrap();
    assert!(reply.text.contains("submitted"));
    assert!(reply.text.contains("Suspected respiratory outbreak"));
    assert_eq!(h.notifier.sent.load(Ordering::SeqCst), 1);

    // The submitted case is complete, so the next start opens a fresh one.
    let reply = h.service.handle(&user, Command::StartOrResume).await.unwrap();
    assert!(reply.text.contains("Starting new case"));
}

#[tokio::test]
async fn incomplete_submit_is_refused_and_session_continues() {
    let h = Harness::new(StubGateway::accepting());
    let user = farmer();

    h.service.handle(&user, Command::StartOrResume).await.unwrap();
    h.fill_form(
        &user,
        "symptoms_performance_data",
        &[("Main Symptoms", "Coughing and sneezing in house 1")],
    )
    .await;

    let reply = h.service.handle(&user, Command::SubmitCase).await.unwrap();
    assert!(reply.text.contains("not complete"));
    assert!(reply.text.contains("Daily Production Performance"));
    assert_eq!(h.notifier.sent.load(Ordering::SeqCst), 0);

    // Still conversing: the form menu remains reachable.
    let reply = h
        .service
        .handle(&user, Command::SelectForm("symptoms_performance_data".to_string()))
        .await
        .unwrap();
    assert!(reply.text.contains("\u{2705} Main Symptoms"));
}

#[tokio::test]
async fn quit_then_resume_restores_the_same_case() {
    let h = Harness::new(StubGateway::accepting());
    let user = farmer();

    h.service.handle(&user, Command::StartOrResume).await.unwrap();
    h.service
        .handle(&user, Command::SelectForm("flock_farm_information".to_string()))
        .await
        .unwrap();
    h.answer(&user, "Type of Chicken", "broiler").await;

    let reply = h.service.handle(&user, Command::SaveAndQuit).await.unwrap();
    assert!(reply.text.contains("Progress saved"));

    let reply = h.service.handle(&user, Command::StartOrResume).await.unwrap();
    assert!(reply.text.contains("Resuming case"));

    // The stored answer still shows as done after the resume.
    let reply = h
        .service
        .handle(&user, Command::SelectForm("flock_farm_information".to_string()))
        .await
        .unwrap();
    assert!(reply.text.contains("\u{2705} Type of Chicken"));
    assert!(reply.text.contains("\u{274c} Age of Chicken"));
}

#[tokio::test]
async fn local_rejection_keeps_the_question_open() {
    let h = Harness::new(StubGateway::accepting());
    let user = farmer();

    h.service.handle(&user, Command::StartOrResume).await.unwrap();
    h.service
        .handle(&user, Command::SelectForm("flock_farm_information".to_string()))
        .await
        .unwrap();
    h.service
        .handle(&user, Command::SelectQuestion("Type of Chicken".to_string()))
        .await
        .unwrap();

    let reply = h
        .service
        .handle(&user, Command::SubmitAnswer("Duck".to_string()))
        .await
        .unwrap();
    assert!(reply.text.contains("Layer"));
    // The original prompt comes back with the explanation.
    assert!(reply.text.contains("What type of chicken is this?"));
    assert_eq!(h.gateway.calls(), 0);

    // Same question, second try, no re-selection needed.
    let reply = h
        .service
        .handle(&user, Command::SubmitAnswer("layer".to_string()))
        .await
        .unwrap();
    assert!(reply.text.contains("\u{2705} Type of Chicken"));
}

#[tokio::test]
async fn gateway_rejection_stores_nothing() {
    let h = Harness::new(StubGateway::with_verdict(Verdict::Rejected(
        "that does not describe a housing setup".to_string(),
    )));
    let user = farmer();

    h.service.handle(&user, Command::StartOrResume).await.unwrap();
    h.service
        .handle(&user, Command::SelectForm("flock_farm_information".to_string()))
        .await
        .unwrap();

    let text = h.answer(&user, "Housing Type", "Closed House").await;
    assert!(text.contains("does not describe"));
    assert_eq!(h.gateway.calls(), 1);
    assert!(h.cases.is_empty());
}

#[tokio::test]
async fn gateway_correction_is_what_gets_stored() {
    let h = Harness::new(StubGateway::with_verdict(Verdict::AcceptedWithCorrection(
        "Open House".to_string(),
    )));
    let user = farmer();

    h.service.handle(&user, Command::StartOrResume).await.unwrap();
    h.service
        .handle(&user, Command::SelectForm("flock_farm_information".to_string()))
        .await
        .unwrap();
    h.answer(&user, "Housing Type", "Opened-Side").await;

    let open = h.cases.fetch_open(&user).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(
        open[0].answers["flock_farm_information"]["Housing Type"].display(),
        "Open House"
    );
}

#[tokio::test]
async fn confirmed_delete_removes_the_stored_case() {
    let h = Harness::new(StubGateway::accepting());
    let user = farmer();

    h.service.handle(&user, Command::StartOrResume).await.unwrap();
    h.fill_form(
        &user,
        "medical_diagnostic_records",
        &[("Lab Data", "Serology sample sent on Monday")],
    )
    .await;
    assert_eq!(h.cases.len(), 1);

    let reply = h.service.handle(&user, Command::DeleteCase).await.unwrap();
    assert!(reply.text.contains("cannot be undone"));

    let reply = h.service.handle(&user, Command::Confirm).await.unwrap();
    assert!(reply.text.contains("deleted"));
    assert!(h.cases.is_empty());

    let reply = h.service.handle(&user, Command::StartOrResume).await.unwrap();
    assert!(reply.text.contains("Starting new case"));
}

#[tokio::test]
async fn cancelled_delete_keeps_the_case() {
    let h = Harness::new(StubGateway::accepting());
    let user = farmer();

    h.service.handle(&user, Command::StartOrResume).await.unwrap();
    h.fill_form(
        &user,
        "medical_diagnostic_records",
        &[("Lab Data", "Serology sample sent on Monday")],
    )
    .await;

    h.service.handle(&user, Command::DeleteCase).await.unwrap();
    let reply = h.service.handle(&user, Command::Cancel).await.unwrap();
    assert!(reply.text.contains("Deletion cancelled"));
    assert_eq!(h.cases.len(), 1);
}
