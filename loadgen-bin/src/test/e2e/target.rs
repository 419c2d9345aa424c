use std::sync::Arc;

use parking_lot::Mutex;
use rama::{
    http::{
        Request,
        header::USER_AGENT,
        server::HttpServer,
        service::web::{Router, response::IntoResponse as _},
    },
    net::socket::Interface,
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing,
};

#[derive(Debug, Clone)]
pub(in crate::test) struct ReceivedRequest {
    pub path: String,
    pub query: Option<String>,
    pub user_agent: Option<String>,
}

/// Load target on an ephemeral local port,
/// answering `/work` with a 200 and recording every request it sees.
#[derive(Debug, Clone)]
pub(in crate::test) struct TargetServer {
    base_url: String,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl TargetServer {
    pub(in crate::test) async fn spawn() -> Self {
        let requests: Arc<Mutex<Vec<ReceivedRequest>>> = Default::default();

        let router = Router::new().with_get("/work", {
            let requests = requests.clone();
            move |req: Request| {
                requests.lock().push(ReceivedRequest {
                    path: req.uri().path().to_owned(),
                    query: req.uri().query().map(ToOwned::to_owned),
                    user_agent: req
                        .headers()
                        .get(USER_AGENT)
                        .and_then(|value| value.to_str().ok())
                        .map(ToOwned::to_owned),
                });
                std::future::ready("ok".into_response())
            }
        });

        let exec = Executor::default();
        let interface: Interface = "127.0.0.1:0".parse().unwrap();
        let tcp_listener = TcpListener::bind(interface, exec.clone()).await.unwrap();
        let addr = tcp_listener.local_addr().unwrap();
        tracing::info!("e2e load target bound to: {addr}");

        let http_server = HttpServer::auto(exec).service(Arc::new(router));
        tokio::spawn(tcp_listener.serve(http_server));

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub(in crate::test) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(in crate::test) fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().clone()
    }
}
