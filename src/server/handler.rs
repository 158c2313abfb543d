// src/server/handler.rs
use hyper::{header, Body, Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tower::Service;

use crate::heartbeat::{Dispatcher, RequestContext};

/// Serves the heartbeat report on a single path.
#[derive(Clone)]
pub struct HeartbeatHandler {
    dispatcher: Arc<Dispatcher>,
    path: Arc<str>,
}

impl HeartbeatHandler {
    pub fn new(dispatcher: Arc<Dispatcher>, path: impl Into<Arc<str>>) -> Self {
        Self {
            dispatcher,
            path: path.into(),
        }
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, hyper::http::Error> {
        if req.uri().path() != &*self.path {
            return Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Body::from("Not Found"));
        }

        if req.method() != Method::GET && req.method() != Method::HEAD {
            return Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header(header::ALLOW, "GET, HEAD")
                .body(Body::empty());
        }

        let ctx = RequestContext::from_query(req.uri().query());
        match self.dispatcher.run(&ctx, ctx.wants_extended()).await {
            Ok(report) => {
                let status = if report.is_healthy() {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                json_response(status, &report)
            }
            Err(e) => json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({ "error": e.to_string() }),
            ),
        }
    }
}

fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
) -> Result<Response<Body>, hyper::http::Error> {
    match serde_json::to_vec(body) {
        Ok(bytes) => Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from(bytes)),
        Err(e) => {
            tracing::error!(%e, "failed to serialize heartbeat response");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from("serialization error"))
        }
    }
}

impl Service<Request<Body>> for HeartbeatHandler {
    type Response = Response<Body>;
    type Error = Box<dyn std::error::Error + Send + Sync>;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move {
            handler.handle(req).await.map_err(|e| {
                tracing::error!(%e, "heartbeat handler error");
                Box::new(e) as Box<dyn std::error::Error + Send + Sync>
            })
        })
    }
}
