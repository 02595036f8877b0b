//! Path-pattern command router
//!
//! Patterns are `/`-delimited; a segment starting with `:` captures the
//! incoming segment under that name. All patterns with the same segment count
//! as the command are tried in registration order until a handler does not
//! decline.

use std::{collections::HashMap, future::Future};

use futures::future::BoxFuture;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::RouteError;

/// What a handler did with a matched command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResult {
    Handled,
    /// Not for this handler; try the next pattern with the same shape
    Declined,
    Error(String),
}

/// Parameters captured from `:name` segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(HashMap<String, String>);

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn parse_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|value| value.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

type Handler<C> = Box<dyn Fn(RouteParams, C) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

struct Route<C> {
    title: String,
    path: String,
    segments: Vec<Segment>,
    handler: Handler<C>,
}

impl<C> Route<C> {
    fn capture(&self, parts: &[&str]) -> Option<RouteParams> {
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), (*part).to_string());
                }
            }
        }
        Some(RouteParams(params))
    }
}

/// Route description exposed to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub title: String,
    pub path: String,
}

/// Router over a handler context `C` cloned into every invocation
pub struct CommandRouter<C> {
    routes: Vec<Route<C>>,
}

impl<C: Clone + Send + 'static> CommandRouter<C> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a pattern. Registration order decides precedence.
    pub fn route<F, Fut>(&mut self, path: &str, title: &str, handler: F) -> &mut Self
    where
        F: Fn(RouteParams, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let segments = path
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();
        self.routes.push(Route {
            title: title.to_string(),
            path: path.to_string(),
            segments,
            handler: Box::new(move |params, context| Box::pin(handler(params, context))),
        });
        self
    }

    pub fn routes(&self) -> Vec<RouteInfo> {
        self.routes
            .iter()
            .map(|route| RouteInfo {
                title: route.title.clone(),
                path: route.path.clone(),
            })
            .collect()
    }

    /// Run the first non-declining handler whose pattern matches `path`.
    ///
    /// Returns the pattern that handled the command.
    pub async fn dispatch(&self, path: &str, context: C) -> Result<&str, RouteError> {
        let parts: Vec<&str> = path.split('/').collect();
        let candidates: Vec<(&Route<C>, RouteParams)> = self
            .routes
            .iter()
            .filter_map(|route| route.capture(&parts).map(|params| (route, params)))
            .collect();

        if candidates.is_empty() {
            error!("Invalid OSC route: {}", path);
            return Err(RouteError::InvalidRoute(path.to_string()));
        }

        for (route, params) in candidates {
            debug!("Executing route: {}", route.path);
            match (route.handler)(params, context.clone()).await {
                HandlerResult::Handled => {
                    info!("OSC complete: {}", path);
                    return Ok(route.path.as_str());
                }
                HandlerResult::Declined => continue,
                HandlerResult::Error(reason) => {
                    error!("OSC route {} failed: {}", path, reason);
                    return Err(RouteError::Handler {
                        path: path.to_string(),
                        reason,
                    });
                }
            }
        }

        warn!("OSC incomplete but has matching path: {}", path);
        Err(RouteError::Incomplete(path.to_string()))
    }
}

impl<C: Clone + Send + 'static> Default for CommandRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    type Calls = Arc<Mutex<Vec<String>>>;

    fn recorder(
        label: &'static str,
        result: HandlerResult,
    ) -> impl Fn(RouteParams, Calls) -> futures::future::Ready<HandlerResult> + Send + Sync {
        move |params: RouteParams, calls: Calls| {
            let id = params.get("id").unwrap_or("-").to_string();
            calls.lock().unwrap().push(format!("{}:{}", label, id));
            futures::future::ready(result.clone())
        }
    }

    #[tokio::test]
    async fn captures_parameters_and_gates_on_segment_count() {
        let calls: Calls = Arc::default();
        let mut router = CommandRouter::new();
        router.route(
            "/Timer/:id/Start",
            "Start",
            recorder("start", HandlerResult::Handled),
        );

        let handled = router.dispatch("/Timer/42/Start", calls.clone()).await;
        assert_eq!(handled, Ok("/Timer/:id/Start"));
        assert_eq!(*calls.lock().unwrap(), vec!["start:42".to_string()]);

        let extra = router.dispatch("/Timer/42/Start/Extra", calls.clone()).await;
        assert_eq!(
            extra,
            Err(RouteError::InvalidRoute("/Timer/42/Start/Extra".to_string()))
        );
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn literal_mismatch_is_an_invalid_route() {
        let calls: Calls = Arc::default();
        let mut router = CommandRouter::new();
        router.route(
            "/Timer/:id/Start",
            "Start",
            recorder("start", HandlerResult::Handled),
        );
        assert!(matches!(
            router.dispatch("/Timer/42/Stop", calls.clone()).await,
            Err(RouteError::InvalidRoute(_))
        ));
    }

    #[tokio::test]
    async fn declined_handler_falls_through_to_next_candidate() {
        let calls: Calls = Arc::default();
        let mut router = CommandRouter::new();
        router
            .route("/Timer/:id/Go", "first", recorder("first", HandlerResult::Declined))
            .route("/Timer/:id/:action", "second", recorder("second", HandlerResult::Handled))
            .route("/Timer/:id/Go", "third", recorder("third", HandlerResult::Handled));

        let handled = router.dispatch("/Timer/7/Go", calls.clone()).await;
        assert_eq!(handled, Ok("/Timer/:id/:action"));
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["first:7".to_string(), "second:7".to_string()]
        );
    }

    #[tokio::test]
    async fn all_declined_is_incomplete_not_invalid() {
        let calls: Calls = Arc::default();
        let mut router = CommandRouter::new();
        router
            .route("/Timer/:id/Go", "a", recorder("a", HandlerResult::Declined))
            .route("/Timer/:id/Go", "b", recorder("b", HandlerResult::Declined));

        assert_eq!(
            router.dispatch("/Timer/x/Go", calls.clone()).await,
            Err(RouteError::Incomplete("/Timer/x/Go".to_string()))
        );
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn handler_error_stops_dispatch() {
        let calls: Calls = Arc::default();
        let mut router = CommandRouter::new();
        router
            .route("/Timer/:id/Go", "a", recorder("a", HandlerResult::Error("boom".into())))
            .route("/Timer/:id/Go", "b", recorder("b", HandlerResult::Handled));

        assert!(matches!(
            router.dispatch("/Timer/1/Go", calls.clone()).await,
            Err(RouteError::Handler { reason, .. }) if reason == "boom"
        ));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn lists_routes_in_registration_order() {
        let calls: Calls = Arc::default();
        let mut router = CommandRouter::new();
        router
            .route("/A", "first", recorder("a", HandlerResult::Handled))
            .route("/B/:x", "second", recorder("b", HandlerResult::Handled));
        let paths: Vec<String> = router.routes().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/A".to_string(), "/B/:x".to_string()]);
    }
}
