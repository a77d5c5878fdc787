//! URL dispatch to sidebar controllers.
//!
//! Patterns are path templates made of literal segments and named captures:
//! `:name` (required), `:name?` (optional, trailing only), `:name(\d+)`
//! (ASCII digits) and `:name(a|b|c)` (one of the listed literals). Routes
//! are scanned in registration order and the first match wins.

use std::{collections::BTreeMap, sync::Arc};

use tracing::{debug, info};
use url::Url;

use crate::{
    controller::{Controller, IdleController, LoadRequest},
    error::RouteError,
};

/// Named capture values extracted from one URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchGroups(BTreeMap<String, String>);

impl MatchGroups {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MatchGroups {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Constraint {
    Any,
    Digits,
    OneOf(Vec<String>),
}

impl Constraint {
    fn accepts(&self, value: &str) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::Digits => value.bytes().all(|b| b.is_ascii_digit()),
            Constraint::OneOf(options) => options.iter().any(|option| option == value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture {
        name: String,
        constraint: Constraint,
        optional: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        if !raw.starts_with('/') {
            return Err(RouteError::NotAbsolute(raw.to_string()));
        }

        let mut segments = Vec::new();
        let mut seen_optional = false;
        for part in raw.split('/').filter(|part| !part.is_empty()) {
            let segment = match part.strip_prefix(':') {
                Some(capture) => parse_capture(raw, part, capture)?,
                None => Segment::Literal(part.to_string()),
            };
            match &segment {
                Segment::Capture { name, .. }
                    if segments.iter().any(
                        |existing| matches!(existing, Segment::Capture { name: n, .. } if n == name),
                    ) =>
                {
                    return Err(RouteError::DuplicateCapture {
                        pattern: raw.to_string(),
                        name: name.clone(),
                    });
                }
                Segment::Capture { optional: true, .. } => seen_optional = true,
                _ if seen_optional => {
                    return Err(RouteError::RequiredAfterOptional(raw.to_string()));
                }
                _ => {}
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> Option<MatchGroups> {
        let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
        if parts.len() > self.segments.len() {
            return None;
        }

        let mut groups = BTreeMap::new();
        for (index, segment) in self.segments.iter().enumerate() {
            match (segment, parts.get(index)) {
                (Segment::Literal(literal), Some(part)) if literal == part => {}
                (
                    Segment::Capture {
                        name, constraint, ..
                    },
                    Some(part),
                ) if constraint.accepts(part) => {
                    groups.insert(name.clone(), (*part).to_string());
                }
                (Segment::Capture { optional: true, .. }, None) => {}
                _ => return None,
            }
        }
        Some(MatchGroups(groups))
    }
}

fn parse_capture(raw: &str, part: &str, capture: &str) -> Result<Segment, RouteError> {
    let invalid = || RouteError::InvalidSegment {
        pattern: raw.to_string(),
        segment: part.to_string(),
    };

    let (head, optional) = match capture.strip_suffix('?') {
        Some(head) => (head, true),
        None => (capture, false),
    };
    let (name, constraint) = match head.split_once('(') {
        Some((name, rest)) => {
            let body = rest.strip_suffix(')').ok_or_else(invalid)?;
            let constraint = if body == r"\d+" {
                Constraint::Digits
            } else if body.is_empty() || body.contains(['(', ')']) {
                return Err(invalid());
            } else {
                Constraint::OneOf(body.split('|').map(str::to_string).collect())
            };
            (name, constraint)
        }
        None => (head, Constraint::Any),
    };

    if name.is_empty() {
        return Err(RouteError::EmptyCapture(raw.to_string()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid());
    }

    Ok(Segment::Capture {
        name: name.to_string(),
        constraint,
        optional,
    })
}

/// A navigated URL split into its parts, query and fragment kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl Location {
    pub fn parse(url: &str) -> Self {
        if let Ok(absolute) = Url::parse(url) {
            if absolute.has_host() {
                return Self {
                    path: absolute.path().to_string(),
                    query: absolute.query().map(str::to_string),
                    fragment: absolute.fragment().map(str::to_string),
                };
            }
        }

        let (rest, fragment) = match url.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (url, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (rest, None),
        };
        Self {
            path: path.to_string(),
            query,
            fragment,
        }
    }
}

pub struct Route {
    name: String,
    pattern: RoutePattern,
    controller: Arc<dyn Controller>,
}

impl Route {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn controller(&self) -> &Arc<dyn Controller> {
        &self.controller
    }
}

/// Outcome of one [`Router::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Matched route, `None` when the fallback controller took over.
    pub route: Option<String>,
    pub groups: MatchGroups,
    /// Whether the active controller was replaced (and the previous one unloaded).
    pub changed: bool,
}

/// Owns the route table and the single active controller.
pub struct Router {
    routes: Vec<Route>,
    fallback: Arc<dyn Controller>,
    active: Option<Arc<dyn Controller>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(IdleController::new()))
    }

    pub fn with_fallback(fallback: Arc<dyn Controller>) -> Self {
        Self {
            routes: Vec::new(),
            fallback,
            active: None,
        }
    }

    /// Appends a route. The route is named after its controller; a controller
    /// instance may serve several patterns. The instance is shared by every
    /// dispatch that matches, so matching it again reloads it in place.
    pub fn register(
        &mut self,
        pattern: &str,
        controller: Arc<dyn Controller>,
    ) -> Result<(), RouteError> {
        let pattern = RoutePattern::parse(pattern)?;
        if self
            .routes
            .iter()
            .any(|route| route.pattern.as_str() == pattern.as_str())
        {
            return Err(RouteError::DuplicateRoute(pattern.as_str().to_string()));
        }
        self.routes.push(Route {
            name: controller.name().to_string(),
            pattern,
            controller,
        });
        Ok(())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn resolve(&self, path: &str) -> Option<(&Route, MatchGroups)> {
        self.routes
            .iter()
            .find_map(|route| route.pattern.matches(path).map(|groups| (route, groups)))
    }

    pub fn active(&self) -> Option<&Arc<dyn Controller>> {
        self.active.as_ref()
    }

    pub async fn dispatch(&mut self, url: &str) -> Dispatch {
        let location = Location::parse(url);
        let (route, groups, next) = match self.resolve(&location.path) {
            Some((route, groups)) => (
                Some(route.name.clone()),
                groups,
                Arc::clone(&route.controller),
            ),
            None => {
                debug!(path = %location.path, "router: no route matched, using fallback");
                (None, MatchGroups::default(), Arc::clone(&self.fallback))
            }
        };

        let changed = !self
            .active
            .as_ref()
            .is_some_and(|active| same_instance(active, &next));
        if changed {
            if let Some(previous) = self.active.take() {
                info!(from = previous.name(), to = next.name(), "router: switching controller");
                previous.unload().await;
            }
        }

        next.load(LoadRequest {
            groups: groups.clone(),
            query: location.query,
            fragment: location.fragment,
        })
        .await;
        self.active = Some(next);

        Dispatch {
            route,
            groups,
            changed,
        }
    }

    /// Releases the sidebar, e.g. when the explorer view is torn down.
    pub async fn unload_active(&mut self) {
        if let Some(previous) = self.active.take() {
            previous.unload().await;
        }
    }
}

fn same_instance(a: &Arc<dyn Controller>, b: &Arc<dyn Controller>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
