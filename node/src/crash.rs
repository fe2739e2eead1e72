//! Crash/recover simulation: a flag that, once set, makes every endpoint
//! except `/sim-recover` fail. Modeled as `actix-web` middleware so handlers
//! never need to check it themselves.

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use std::future::{Ready, ready};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct CrashState {
    crashed: AtomicBool,
}

impl CrashState {
    pub fn new() -> Self {
        CrashState {
            crashed: AtomicBool::new(false),
        }
    }

    pub fn crash(&self) {
        self.crashed.store(true, Ordering::SeqCst);
        tracing::warn!("simulated crash: all requests except /sim-recover now fail");
    }

    pub fn recover(&self) {
        self.crashed.store(false, Ordering::SeqCst);
        tracing::info!("recovered from simulated crash");
    }

    pub fn is_crashed(&self) -> bool {
        self.crashed.load(Ordering::SeqCst)
    }
}

impl Default for CrashState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CrashSimulator {
    state: Arc<CrashState>,
}

impl CrashSimulator {
    pub fn new(state: Arc<CrashState>) -> Self {
        CrashSimulator { state }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CrashSimulator
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = CrashSimulatorMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CrashSimulatorMiddleware {
            service,
            state: Arc::clone(&self.state),
        }))
    }
}

pub struct CrashSimulatorMiddleware<S> {
    service: S,
    state: Arc<CrashState>,
}

impl<S, B> Service<ServiceRequest> for CrashSimulatorMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let is_recover = req.path() == "/sim-recover";
        if self.state.is_crashed() && !is_recover {
            // GET endpoints say "Node has crashed", PUT endpoints say "Node
            // is crashed" — distinguish by method.
            let body = if req.method() == actix_web::http::Method::GET {
                "Node has crashed"
            } else {
                "Node is crashed"
            };
            return Box::pin(async move {
                let (req, _) = req.into_parts();
                let response = HttpResponse::InternalServerError()
                    .content_type("text/plain")
                    .body(body);
                Ok(ServiceResponse::new(req, response).map_into_right_body())
            });
        }
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crash_then_recover_round_trips() {
        let state = CrashState::new();
        assert!(!state.is_crashed());
        state.crash();
        assert!(state.is_crashed());
        state.recover();
        assert!(!state.is_crashed());
    }
}
