use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use seed_inventory_confirmation::auth::LoginResult;
use seed_inventory_confirmation::config::Credentials;
use seed_inventory_confirmation::models::{Route, RouteStatus};
use seed_inventory_confirmation::scraper::extractor::{
    DetailLayout, ExclusionRules, SummaryLayout, TableSnapshot,
};
use seed_inventory_confirmation::scraper::{EventSink, Portal, ScrapeEvent};
use seed_inventory_confirmation::workflow::until_cancelled;
use seed_inventory_confirmation::{run_confirmation, run_with_teardown, RunSettings, ScrapeError};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 7).unwrap()
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn summary(routes: &[(&str, &str)]) -> TableSnapshot {
    let mut rows: Vec<Vec<String>> = (0..6).map(|i| row(&["", format!("header {i}").as_str()])).collect();
    for &(name, missing) in routes {
        rows.push(row(&["", name, "", "", missing]));
    }
    rows.push(row(&["", "Notes:"]));
    TableSnapshot::new(rows)
}

fn detail(assets: &[(&str, &str, &str, &str)]) -> TableSnapshot {
    let mut rows = vec![row(&["Asset", "Location", "Type", "Inventory", "Restock"])];
    for &(id, location, kind, status) in assets {
        rows.push(row(&[id, location, kind, status, "07:45"]));
    }
    TableSnapshot::new(rows)
}

#[derive(Default)]
struct Calls {
    closes: u32,
    returns: u32,
    opened: Vec<String>,
}

/// In-memory stand-in for the browser-backed portal.
struct FakePortal {
    login_ok: bool,
    summary: TableSnapshot,
    details: HashMap<String, TableSnapshot>,
    failing: HashSet<String>,
    broken_links: HashSet<String>,
    close_fails: bool,
    current: Option<String>,
    calls: Arc<Mutex<Calls>>,
}

impl FakePortal {
    fn new(summary: TableSnapshot) -> Self {
        Self {
            login_ok: true,
            summary,
            details: HashMap::new(),
            failing: HashSet::new(),
            broken_links: HashSet::new(),
            close_fails: false,
            current: None,
            calls: Arc::new(Mutex::new(Calls::default())),
        }
    }

    fn with_detail(mut self, route: &str, table: TableSnapshot) -> Self {
        self.details.insert(route.to_string(), table);
        self
    }

    fn failing_on(mut self, route: &str) -> Self {
        self.failing.insert(route.to_string());
        self
    }

    fn broken_link_on(mut self, route: &str) -> Self {
        self.broken_links.insert(route.to_string());
        self
    }

    fn calls(&self) -> Arc<Mutex<Calls>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Portal for FakePortal {
    async fn login(&mut self, _credentials: &Credentials) -> Result<LoginResult, ScrapeError> {
        Ok(LoginResult {
            success: self.login_ok,
            cluster_prefix: self.login_ok.then(|| "cs3".to_string()),
        })
    }

    async fn open_summary(&mut self, _date: NaiveDate) -> Result<(), ScrapeError> {
        Ok(())
    }

    async fn summary_table(&mut self) -> Result<TableSnapshot, ScrapeError> {
        Ok(self.summary.clone())
    }

    async fn open_route_detail(&mut self, route: &Route) -> Result<bool, ScrapeError> {
        self.calls.lock().unwrap().opened.push(route.name.clone());
        if self.broken_links.contains(&route.name) {
            return Err(ScrapeError::Navigation(format!("{} link did not open", route.name)));
        }
        if !self.details.contains_key(&route.name) && !self.failing.contains(&route.name) {
            return Ok(false);
        }
        self.current = Some(route.name.clone());
        Ok(true)
    }

    async fn detail_table(&mut self) -> Result<TableSnapshot, ScrapeError> {
        let route = self.current.clone().unwrap_or_default();
        if self.failing.contains(&route) {
            return Err(ScrapeError::Timeout {
                what: "detail table".to_string(),
                secs: 10,
            });
        }
        Ok(self.details[&route].clone())
    }

    async fn return_to_summary(&mut self) -> Result<(), ScrapeError> {
        self.current = None;
        self.calls.lock().unwrap().returns += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        self.calls.lock().unwrap().closes += 1;
        if self.close_fails {
            return Err(ScrapeError::BrowserSetup("chromedriver already gone".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<ScrapeEvent>>);

impl EventSink for Recorder {
    fn emit(&self, event: &ScrapeEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

impl Recorder {
    fn events(&self) -> Vec<ScrapeEvent> {
        self.0.lock().unwrap().clone()
    }
}

fn settings() -> RunSettings {
    RunSettings {
        credentials: Credentials {
            username: "ops@example.com".to_string(),
            password: "hunter2".to_string(),
        },
        target_date: date(),
        summary: SummaryLayout::default(),
        detail: DetailLayout::default(),
        exclusions: ExclusionRules::default(),
    }
}

fn three_routes() -> FakePortal {
    FakePortal::new(summary(&[("Rt 101", "2"), ("Rt 102", "1"), ("Rt 103", "3")]))
        .with_detail(
            "Rt 101",
            detail(&[
                ("M-1", "Lobby", "Snack", "--"),
                ("M-2", "Hall", "Snack", "12"),
            ]),
        )
        .with_detail("Rt 103", detail(&[("M-9", "Dock", "Market", "--")]))
        .failing_on("Rt 102")
}

#[tokio::test]
async fn failing_route_does_not_stop_the_rest() {
    let mut portal = three_routes();
    let recorder = Recorder::default();

    let report = run_confirmation(&mut portal, &settings(), &recorder).await.unwrap();

    let statuses: Vec<_> = report.routes.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [RouteStatus::Incomplete, RouteStatus::Error, RouteStatus::Incomplete]
    );
    assert!(report.routes[1].error.as_deref().unwrap().contains("detail table"));
    assert!(report.routes[1].assets.is_empty());

    let ids: Vec<_> = report.records.iter().map(|r| r.asset_id.as_str()).collect();
    assert_eq!(ids, ["M-1", "M-9"]);
    assert!(report.records.iter().all(|r| r.date == date()));

    assert!(recorder.events().contains(&ScrapeEvent::RouteFailed {
        route: "Rt 102".to_string(),
        error: "timed out after 10s waiting for detail table".to_string(),
    }));
    // Two successful routes plus recovery after the failure.
    assert_eq!(portal.calls().lock().unwrap().returns, 3);
}

#[tokio::test]
async fn route_without_link_is_reported_not_failed() {
    let mut portal = FakePortal::new(summary(&[("Rt 205", "4"), ("Rt 206", "1")]))
        .with_detail("Rt 206", detail(&[("M-5", "Gym", "Snack", "--")]));

    let report = run_confirmation(&mut portal, &settings(), &Recorder::default())
        .await
        .unwrap();

    assert_eq!(report.routes[0].status, RouteStatus::NoLinkFound);
    assert_eq!(report.routes[0].error, None);
    assert_eq!(report.routes[1].status, RouteStatus::Incomplete);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].route, "Rt 206");
}

#[tokio::test]
async fn routes_without_missing_counts_are_skipped() {
    let mut portal = FakePortal::new(summary(&[("Rt 305", "4"), ("Rt 306", ""), ("Rt 307", "0")]))
        .with_detail("Rt 305", detail(&[]));
    let calls = portal.calls();

    let report = run_confirmation(&mut portal, &settings(), &Recorder::default())
        .await
        .unwrap();

    assert_eq!(report.routes_found(), 1);
    assert_eq!(calls.lock().unwrap().opened, ["Rt 305"]);
}

#[tokio::test]
async fn empty_summary_is_no_route_data() {
    let mut portal = FakePortal::new(summary(&[("Rt 401", "")]));

    let err = run_confirmation(&mut portal, &settings(), &Recorder::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::NoRouteData { date: d } if d == date()));
}

#[tokio::test]
async fn excluded_categories_are_dropped() {
    let mut portal = FakePortal::new(summary(&[("Rt 501", "3")])).with_detail(
        "Rt 501",
        detail(&[
            ("M-1", "Lobby", "Snack", "--"),
            ("FF-102", "Kitchen", "Fresh Food", "--"),
            ("C-7", "Break Room", "Coffee", "--"),
        ]),
    );
    let recorder = Recorder::default();

    let report = run_confirmation(&mut portal, &settings(), &recorder).await.unwrap();

    let ids: Vec<_> = report.records.iter().map(|r| r.asset_id.as_str()).collect();
    assert_eq!(ids, ["M-1"]);
    let excluded: Vec<_> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ScrapeEvent::AssetExcluded { asset_id, .. } => Some(asset_id),
            _ => None,
        })
        .collect();
    assert_eq!(excluded, ["FF-102", "C-7"]);
}

#[tokio::test]
async fn session_closed_once_after_success() {
    let portal = three_routes();
    let calls = portal.calls();
    let recorder = Recorder::default();

    let report = run_with_teardown(portal, &settings(), &recorder, std::future::pending())
        .await
        .unwrap();

    assert_eq!(report.routes_found(), 3);
    assert_eq!(calls.lock().unwrap().closes, 1);
    assert_eq!(recorder.events().last(), Some(&ScrapeEvent::SessionClosed));
}

#[tokio::test]
async fn session_closed_once_after_rejected_login() {
    let mut portal = three_routes();
    portal.login_ok = false;
    let calls = portal.calls();

    let err = run_with_teardown(portal, &settings(), &Recorder::default(), std::future::pending())
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Authentication(_)));
    assert_eq!(calls.lock().unwrap().closes, 1);
    assert!(calls.lock().unwrap().opened.is_empty());
}

#[tokio::test]
async fn session_closed_once_after_no_route_data() {
    let portal = FakePortal::new(summary(&[]));
    let calls = portal.calls();

    let err = run_with_teardown(portal, &settings(), &Recorder::default(), std::future::pending())
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::NoRouteData { .. }));
    assert_eq!(calls.lock().unwrap().closes, 1);
}

#[tokio::test]
async fn interrupt_still_closes_session() {
    let portal = three_routes();
    let calls = portal.calls();

    let err = run_with_teardown(portal, &settings(), &Recorder::default(), std::future::ready(()))
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Interrupted));
    assert_eq!(calls.lock().unwrap().closes, 1);
}

#[tokio::test]
async fn detail_navigation_error_is_contained_to_its_route() {
    let mut portal = FakePortal::new(summary(&[("Rt 601", "1"), ("Rt 602", "2"), ("Rt 603", "1")]))
        .with_detail("Rt 601", detail(&[("M-1", "Lobby", "Snack", "--")]))
        .with_detail("Rt 602", detail(&[("M-2", "Hall", "Snack", "--")]))
        .with_detail("Rt 603", detail(&[("M-3", "Dock", "Market", "--")]))
        .broken_link_on("Rt 602");
    let calls = portal.calls();
    let recorder = Recorder::default();

    let report = run_confirmation(&mut portal, &settings(), &recorder).await.unwrap();

    let statuses: Vec<_> = report.routes.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [RouteStatus::Incomplete, RouteStatus::Error, RouteStatus::Incomplete]
    );
    assert!(report.routes[1].assets.is_empty());
    assert_eq!(
        report.routes[1].error.as_deref(),
        Some("navigation failed: Rt 602 link did not open")
    );
    let ids: Vec<_> = report.records.iter().map(|r| r.asset_id.as_str()).collect();
    assert_eq!(ids, ["M-1", "M-3"]);
    // Recovery after the failed route keeps the next link reachable.
    assert_eq!(calls.lock().unwrap().opened, ["Rt 601", "Rt 602", "Rt 603"]);
    assert_eq!(calls.lock().unwrap().returns, 3);
}

#[tokio::test]
async fn failed_close_keeps_the_run_outcome() {
    let mut portal = three_routes();
    portal.close_fails = true;
    let calls = portal.calls();
    let recorder = Recorder::default();

    let report = run_with_teardown(portal, &settings(), &recorder, std::future::pending())
        .await
        .unwrap();

    assert_eq!(report.routes_found(), 3);
    assert_eq!(calls.lock().unwrap().closes, 1);
    assert_eq!(
        recorder.events().last(),
        Some(&ScrapeEvent::TeardownFailed {
            error: "browser setup failed: chromedriver already gone".to_string(),
        })
    );
    assert!(!recorder.events().contains(&ScrapeEvent::SessionClosed));
}

#[tokio::test]
async fn failed_close_keeps_the_run_error() {
    let mut portal = FakePortal::new(summary(&[]));
    portal.close_fails = true;

    let err = run_with_teardown(portal, &settings(), &Recorder::default(), std::future::pending())
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::NoRouteData { .. }));
}

#[tokio::test]
async fn interrupt_during_setup_skips_the_session() {
    let mut interrupt = std::future::ready(());
    let opened = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&opened);

    let result = until_cancelled(
        async move {
            *flag.lock().unwrap() = true;
            Ok::<_, ScrapeError>(three_routes())
        },
        &mut interrupt,
    )
    .await;

    assert!(matches!(result, Err(ScrapeError::Interrupted)));
    assert!(!*opened.lock().unwrap());
}

#[tokio::test]
async fn setup_completes_when_not_interrupted() {
    let mut interrupt = std::future::pending::<()>();
    let portal = until_cancelled(async { Ok::<_, ScrapeError>(three_routes()) }, &mut interrupt)
        .await
        .unwrap();
    let calls = portal.calls();

    run_with_teardown(portal, &settings(), &Recorder::default(), interrupt)
        .await
        .unwrap();
    assert_eq!(calls.lock().unwrap().closes, 1);
}
