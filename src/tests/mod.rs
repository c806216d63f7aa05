use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::client::{ClientError, ClientOptions, HomeClient};
use crate::controller::{ControllerError, PageController, ToggleOutcome};
use crate::panel::{Indicator, PanelState};
use crate::search::{RowFilter, SearchArgs};

#[derive(Clone)]
struct StubRoute {
    status: u16,
    body: String,
    delay: Duration,
}

fn route(status: u16, body: &str) -> StubRoute {
    StubRoute {
        status,
        body: body.to_string(),
        delay: Duration::ZERO,
    }
}

fn slow_route(status: u16, body: &str, delay_ms: u64) -> StubRoute {
    StubRoute {
        status,
        body: body.to_string(),
        delay: Duration::from_millis(delay_ms),
    }
}

/// Minimal in-process HTTP server. Records every request path in arrival
/// order and answers from a fixed route table (404 otherwise).
async fn serve(routes: HashMap<String, StubRoute>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let paths: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let routes = Arc::new(routes);
    let recorded = Arc::clone(&paths);

    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            let routes = Arc::clone(&routes);
            let recorded = Arc::clone(&recorded);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0usize;
                loop {
                    match sock.read(&mut buf[read..]).await {
                        Ok(0) => break,
                        Ok(n) => {
                            read += n;
                            if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                            if read == buf.len() {
                                break;
                            }
                        }
                        Err(_) => return,
                    }
                }
                let request = String::from_utf8_lossy(&buf[..read]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                recorded.lock().await.push(path.clone());

                let stub = routes.get(&path).cloned().unwrap_or(StubRoute {
                    status: 404,
                    body: String::new(),
                    delay: Duration::ZERO,
                });
                if !stub.delay.is_zero() {
                    tokio::time::sleep(stub.delay).await;
                }
                let reason = if stub.status == 200 { "OK" } else { "X" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    stub.status,
                    reason,
                    stub.body.len(),
                    stub.body
                );
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), paths)
}

fn controller_for(base: &str) -> PageController<RowFilter> {
    let client = HomeClient::new(base, &ClientOptions::default()).unwrap();
    PageController::new(client, RowFilter::new())
}

const FICTION_ROWS: &str =
    "<tr><td>Dune</td><td>1965</td></tr><tr><td>Emma</td><td>1815</td></tr>";

#[tokio::test]
async fn load_then_unload_flips_state_and_hits_both_endpoints() {
    let mut routes = HashMap::new();
    routes.insert("/load/fiction".to_string(), route(200, FICTION_ROWS));
    routes.insert("/unload/fiction".to_string(), route(200, ""));
    let (base, paths) = serve(routes).await;

    let controller = controller_for(&base);
    controller.init(&["fiction".to_string()]).await;

    let outcome = controller.toggle("fiction").await.unwrap();
    assert_eq!(outcome, ToggleOutcome::Loaded { rows: 2 });
    let panels = controller.panels().await;
    assert_eq!(panels[0].state, PanelState::Loaded);
    assert_eq!(panels[0].indicator, Indicator::Idle);
    assert_eq!(panels[0].rows[0].text(), "Dune 1965");

    let outcome = controller.toggle("fiction").await.unwrap();
    assert_eq!(outcome, ToggleOutcome::Unloaded);
    let panels = controller.panels().await;
    assert_eq!(panels[0].state, PanelState::Unloaded);
    assert!(panels[0].rows.is_empty());

    let seen = paths.lock().await.clone();
    assert_eq!(
        seen,
        vec!["/load/fiction".to_string(), "/unload/fiction".to_string()]
    );
}

#[tokio::test]
async fn category_name_is_percent_encoded_on_the_wire() {
    let mut routes = HashMap::new();
    routes.insert(
        "/load/science%20fiction".to_string(),
        route(200, "<tr><td>Solaris</td></tr>"),
    );
    let (base, paths) = serve(routes).await;

    let controller = controller_for(&base);
    controller.init(&["science fiction".to_string()]).await;

    let outcome = controller.toggle("science fiction").await.unwrap();
    assert_eq!(outcome, ToggleOutcome::Loaded { rows: 1 });
    let seen = paths.lock().await.clone();
    assert_eq!(seen, vec!["/load/science%20fiction".to_string()]);
}

#[tokio::test]
async fn search_filter_is_rerun_after_every_toggle() {
    let mut routes = HashMap::new();
    routes.insert("/load/fiction".to_string(), route(200, FICTION_ROWS));
    routes.insert("/unload/fiction".to_string(), route(200, ""));
    let (base, _paths) = serve(routes).await;

    let controller = controller_for(&base);
    controller.init(&["fiction".to_string()]).await;

    // Initialization already ran the collaborator once, with the fixed
    // arguments and an empty shelf.
    controller
        .with_search(|f| {
            assert_eq!(f.args(), Some(&SearchArgs::default()));
            assert_eq!(f.row_count(), 0);
        })
        .await;

    controller.toggle("fiction").await.unwrap();
    controller
        .with_search(|f| {
            assert_eq!(f.row_count(), 2);
            assert_eq!(f.filter("dune").len(), 1);
        })
        .await;

    controller.toggle("fiction").await.unwrap();
    controller
        .with_search(|f| assert_eq!(f.row_count(), 0))
        .await;
}

#[tokio::test]
async fn non_2xx_load_flags_error_and_keeps_state() {
    let mut routes = HashMap::new();
    routes.insert("/load/fiction".to_string(), route(500, "boom"));
    let (base, _paths) = serve(routes).await;

    let controller = controller_for(&base);
    controller.init(&["fiction".to_string()]).await;

    let err = controller.toggle("fiction").await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Request {
            source: ClientError::Status { status: 500, .. },
            ..
        }
    ));
    let panels = controller.panels().await;
    assert_eq!(panels[0].state, PanelState::Unloaded);
    assert_eq!(panels[0].indicator, Indicator::Error);
}

#[tokio::test]
async fn malformed_fragment_is_rejected() {
    let mut routes = HashMap::new();
    routes.insert(
        "/load/fiction".to_string(),
        route(200, "<div>error page</div>"),
    );
    let (base, _paths) = serve(routes).await;

    let controller = controller_for(&base);
    controller.init(&["fiction".to_string()]).await;

    let err = controller.toggle("fiction").await.unwrap_err();
    assert!(matches!(err, ControllerError::Fragment { .. }));
    let panels = controller.panels().await;
    assert_eq!(panels[0].state, PanelState::Unloaded);
    assert_eq!(panels[0].indicator, Indicator::Error);
}

#[tokio::test]
async fn network_failure_surfaces_as_request_error() {
    // Port 1 on loopback refuses connections.
    let controller = controller_for("http://127.0.0.1:1/");
    controller.init(&["fiction".to_string()]).await;

    let err = controller.toggle("fiction").await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Request {
            source: ClientError::Network { .. },
            ..
        }
    ));
    let panels = controller.panels().await;
    assert_eq!(panels[0].indicator, Indicator::Error);
}

#[tokio::test]
async fn unknown_category_is_rejected_without_any_request() {
    let (base, paths) = serve(HashMap::new()).await;
    let controller = controller_for(&base);
    controller.init(&["fiction".to_string()]).await;

    let err = controller.toggle("atlases").await.unwrap_err();
    assert!(matches!(err, ControllerError::UnknownCategory { .. }));
    assert!(paths.lock().await.is_empty());
}

#[tokio::test]
async fn duplicate_toggle_while_in_flight_is_ignored() {
    let mut routes = HashMap::new();
    routes.insert(
        "/load/fiction".to_string(),
        slow_route(200, FICTION_ROWS, 300),
    );
    let (base, paths) = serve(routes).await;

    let controller = controller_for(&base);
    controller.init(&["fiction".to_string()]).await;

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.toggle("fiction").await })
    };
    tokio::time::sleep(Duration::from_millis(80)).await;

    // The indicator is up while the first request is pending, and the
    // second click issues nothing.
    let panels = controller.panels().await;
    assert_eq!(panels[0].indicator, Indicator::Loading);
    let second = controller.toggle("fiction").await.unwrap();
    assert_eq!(second, ToggleOutcome::InFlight);

    let first = first.await.unwrap().unwrap();
    assert_eq!(first, ToggleOutcome::Loaded { rows: 2 });
    let panels = controller.panels().await;
    assert_eq!(panels[0].indicator, Indicator::Idle);

    let seen = paths.lock().await.clone();
    assert_eq!(seen, vec!["/load/fiction".to_string()]);
}

#[tokio::test]
async fn panels_toggle_independently_and_concurrently() {
    let mut routes = HashMap::new();
    routes.insert(
        "/load/fiction".to_string(),
        slow_route(200, FICTION_ROWS, 150),
    );
    routes.insert(
        "/load/atlases".to_string(),
        slow_route(200, "<tr><td>World</td></tr>", 150),
    );
    let (base, _paths) = serve(routes).await;

    let controller = controller_for(&base);
    controller
        .init(&["fiction".to_string(), "atlases".to_string()])
        .await;

    let a = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.toggle("fiction").await })
    };
    let b = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.toggle("atlases").await })
    };
    assert_eq!(a.await.unwrap().unwrap(), ToggleOutcome::Loaded { rows: 2 });
    assert_eq!(b.await.unwrap().unwrap(), ToggleOutcome::Loaded { rows: 1 });

    let panels = controller.panels().await;
    assert!(panels.iter().all(|p| p.state == PanelState::Loaded));
}

#[tokio::test]
async fn quit_fetches_page_then_fires_action_in_order() {
    let mut routes = HashMap::new();
    routes.insert(
        "/rsrc/html/quit.html".to_string(),
        route(200, "<html>goodbye</html>"),
    );
    routes.insert("/action/quit".to_string(), route(200, ""));
    let (base, paths) = serve(routes).await;

    let controller = controller_for(&base);
    controller.init(&["fiction".to_string()]).await;

    let body = controller.quit().await.unwrap();
    assert_eq!(body, "<html>goodbye</html>");
    assert_eq!(
        controller.page_root().await.as_deref(),
        Some("<html>goodbye</html>")
    );
    // The page root replacement drops the shelf.
    assert!(controller.panels().await.is_empty());

    let seen = paths.lock().await.clone();
    assert_eq!(
        seen,
        vec!["/rsrc/html/quit.html".to_string(), "/action/quit".to_string()]
    );
}

#[tokio::test]
async fn failed_quit_page_fetch_suppresses_the_action() {
    let mut routes = HashMap::new();
    routes.insert("/rsrc/html/quit.html".to_string(), route(500, ""));
    let (base, paths) = serve(routes).await;

    let controller = controller_for(&base);
    controller.init(&["fiction".to_string()]).await;

    let err = controller.quit().await.unwrap_err();
    assert!(matches!(err, ControllerError::QuitPage { .. }));
    // The panels survive; nothing was replaced.
    assert_eq!(controller.panels().await.len(), 1);

    let seen = paths.lock().await.clone();
    assert_eq!(seen, vec!["/rsrc/html/quit.html".to_string()]);
}

#[tokio::test]
async fn quit_action_failure_is_ignored() {
    // No /action/quit route: the stub answers 404, which fire-and-forget
    // swallows.
    let mut routes = HashMap::new();
    routes.insert(
        "/rsrc/html/quit.html".to_string(),
        route(200, "<html>goodbye</html>"),
    );
    let (base, paths) = serve(routes).await;

    let controller = controller_for(&base);
    controller.init(&[]).await;

    assert!(controller.quit().await.is_ok());
    let seen = paths.lock().await.clone();
    assert_eq!(
        seen,
        vec!["/rsrc/html/quit.html".to_string(), "/action/quit".to_string()]
    );
}

#[tokio::test]
async fn end_to_end_fiction_example() {
    // Anchor with data-catname="fiction" in an unloaded container, clicked:
    // GET /load/fiction, rows installed, class flips to loaded.
    let mut routes = HashMap::new();
    routes.insert(
        "/load/fiction".to_string(),
        route(
            200,
            "<tr><td><a href=\"/view/dune\">Dune</a></td><td>1965</td></tr>",
        ),
    );
    let (base, paths) = serve(routes).await;

    let controller = controller_for(&base);
    controller.init(&["fiction".to_string()]).await;
    let outcome = controller.toggle("fiction").await.unwrap();

    assert_eq!(outcome, ToggleOutcome::Loaded { rows: 1 });
    assert_eq!(paths.lock().await.clone(), vec!["/load/fiction".to_string()]);
    let panels = controller.panels().await;
    assert_eq!(panels[0].state, PanelState::Loaded);
    assert_eq!(panels[0].rows[0].cells, vec!["Dune".to_string(), "1965".to_string()]);
}
