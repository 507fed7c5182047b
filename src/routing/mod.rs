//! Longest-prefix route matching on `(host, path)`.
//!
//! A [`Route`] is compiled from a `[host]/path` source pattern and a
//! resolved [`Target`]. The [`RouteTable`] is built once at startup and
//! never mutated, so [`RouteTable::lookup`] needs no synchronization.
//! Among all routes whose host and path prefix match, the longest prefix
//! wins; equal prefixes resolve to the earliest registered route.

pub mod path;
pub mod target;

use crate::config::RouteSpec;
use crate::error::{PorticoError, ValidationError};

pub use target::{Target, UpstreamOrigin};

#[derive(Debug, Clone)]
pub struct Route {
    host: String,
    prefix: String,
    target: Target,
}

#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'r, 'p> {
    pub route: &'r Route,
    /// Request path with the route prefix stripped; never empty.
    pub remainder: &'p str,
}

impl Route {
    /// Compile a source pattern. Everything before the first `/` is the
    /// host; the rest, minus trailing slashes, is the path prefix.
    pub fn new(source: &str, target: Target) -> Result<Self, String> {
        let (host, prefix) = split_source(source)?;
        Ok(Self {
            host,
            prefix,
            target,
        })
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        (!self.host.is_empty()).then_some(self.host.as_str())
    }

    /// Path prefix without trailing slash. The root route has an empty prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub fn pattern(&self) -> String {
        format!("{}{}/", self.host, self.prefix)
    }

    fn matches(&self, host: Option<&str>, path: &str) -> bool {
        if !self.host.is_empty() && host != Some(self.host.as_str()) {
            return false;
        }
        path.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

fn split_source(source: &str) -> Result<(String, String), String> {
    let Some(path_start) = source.find('/') else {
        return Err("source path must start with '/'".into());
    };
    Ok((
        source[..path_start].to_string(),
        source[path_start..].trim_end_matches('/').to_string(),
    ))
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.pattern(), self.target)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    #[must_use]
    pub const fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Resolve every route spec, collecting all failures instead of
    /// stopping at the first one.
    pub fn build(specs: &[RouteSpec]) -> Result<Self, PorticoError> {
        let mut routes = Vec::with_capacity(specs.len());
        let mut errors = Vec::new();

        for spec in specs {
            let route_id = spec.to_string();

            let target = Target::resolve(&spec.target).map_err(|message| ValidationError {
                route: route_id.clone(),
                field: "target".into(),
                message,
                suggestion: None,
            });

            let source = split_source(&spec.source).map_err(|message| ValidationError {
                route: route_id.clone(),
                field: "source".into(),
                message,
                suggestion: (!spec.source.is_empty())
                    .then(|| format!("did you mean '/{}'?", spec.source)),
            });

            match (source, target) {
                (Ok((host, prefix)), Ok(target)) => routes.push(Route {
                    host,
                    prefix,
                    target,
                }),
                (source, target) => {
                    errors.extend(source.err());
                    errors.extend(target.err());
                }
            }
        }

        if errors.is_empty() {
            Ok(Self::new(routes))
        } else {
            Err(PorticoError::ConfigValidation { errors })
        }
    }

    /// Find the most specific route for `host` (port already stripped) and
    /// `path`.
    #[must_use]
    pub fn lookup<'r, 'p>(&'r self, host: Option<&str>, path: &'p str) -> Option<RouteMatch<'r, 'p>> {
        let mut best: Option<&Route> = None;
        for route in &self.routes {
            if route.matches(host, path)
                && best.map_or(true, |b| route.prefix.len() > b.prefix.len())
            {
                best = Some(route);
            }
        }

        best.map(|route| {
            let rest = &path[route.prefix.len()..];
            RouteMatch {
                route,
                remainder: if rest.is_empty() { "/" } else { rest },
            }
        })
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(url: &str) -> Target {
        Target::resolve(url).unwrap()
    }

    fn build_table(sources: &[&str]) -> RouteTable {
        RouteTable::new(
            sources
                .iter()
                .enumerate()
                .map(|(i, s)| Route::new(s, upstream(&format!("http://backend-{i}"))).unwrap())
                .collect(),
        )
    }

    fn matched_index(table: &RouteTable, host: Option<&str>, path: &str) -> Option<usize> {
        let m = table.lookup(host, path)?;
        table.routes().iter().position(|r| std::ptr::eq(r, m.route))
    }

    #[test]
    fn source_without_slash_is_rejected() {
        let err = Route::new("invalidsource", upstream("http://up")).unwrap_err();
        assert!(err.contains('/'));
    }

    #[test]
    fn source_splits_host_and_prefix() {
        let route = Route::new("www.example.com/api//", upstream("http://up")).unwrap();
        assert_eq!(route.host(), Some("www.example.com"));
        assert_eq!(route.prefix(), "/api");
        assert_eq!(route.pattern(), "www.example.com/api/");

        let root = Route::new("/", upstream("http://up")).unwrap();
        assert_eq!(root.host(), None);
        assert_eq!(root.prefix(), "");
    }

    #[test]
    fn longest_prefix_wins_regardless_of_order() {
        let table = build_table(&["/api/v1", "/", "/api"]);
        assert_eq!(matched_index(&table, None, "/api/v1/pets"), Some(0));
        assert_eq!(matched_index(&table, None, "/api/v2/pets"), Some(2));
        assert_eq!(matched_index(&table, None, "/other"), Some(1));
    }

    #[test]
    fn prefix_matches_whole_segments_only() {
        let table = build_table(&["/api"]);
        assert_eq!(matched_index(&table, None, "/api"), Some(0));
        assert_eq!(matched_index(&table, None, "/api/"), Some(0));
        assert_eq!(matched_index(&table, None, "/apiary"), None);
    }

    #[test]
    fn equal_prefixes_prefer_earliest() {
        let table = build_table(&["/docs", "/docs/"]);
        assert_eq!(matched_index(&table, None, "/docs/x"), Some(0));
    }

    #[test]
    fn host_restricts_match() {
        let table = build_table(&["example.com/app", "/"]);
        assert_eq!(matched_index(&table, Some("example.com"), "/app/x"), Some(0));
        assert_eq!(matched_index(&table, Some("other.org"), "/app/x"), Some(1));
        assert_eq!(matched_index(&table, None, "/app/x"), Some(1));
    }

    #[test]
    fn host_route_ties_on_prefix_length() {
        let table = build_table(&["/", "example.com/"]);
        assert_eq!(matched_index(&table, Some("example.com"), "/x"), Some(0));

        let table = build_table(&["example.com/", "/"]);
        assert_eq!(matched_index(&table, Some("example.com"), "/x"), Some(0));
        assert_eq!(matched_index(&table, Some("other.org"), "/x"), Some(1));
    }

    #[test]
    fn remainder_strips_prefix() {
        let table = build_table(&["/api", "/"]);
        assert_eq!(table.lookup(None, "/api/pets/1").unwrap().remainder, "/pets/1");
        assert_eq!(table.lookup(None, "/api").unwrap().remainder, "/");
        assert_eq!(table.lookup(None, "/index.html").unwrap().remainder, "/index.html");
    }

    #[test]
    fn no_match_returns_none() {
        let table = build_table(&["/api"]);
        assert!(table.lookup(None, "/").is_none());
        assert!(RouteTable::default().lookup(None, "/").is_none());
    }

    #[test]
    fn build_collects_every_error() {
        let specs = vec![
            RouteSpec::new("nosource", "."),
            RouteSpec::new("/static", "./nosuchdir"),
            RouteSpec::new("/ok", "."),
        ];
        let Err(PorticoError::ConfigValidation { errors }) = RouteTable::build(&specs) else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "source");
        assert_eq!(errors[0].suggestion.as_deref(), Some("did you mean '/nosource'?"));
        assert_eq!(errors[1].field, "target");
        assert!(errors[1].message.contains("nosuchdir"));
    }

    #[test]
    fn build_keeps_registration_order() {
        let specs = vec![RouteSpec::new("/", "."), RouteSpec::new("/api", "http://up/v1")];
        let table = RouteTable::build(&specs).unwrap();
        assert_eq!(table.len(), 2);
        assert!(!table.routes()[0].target().is_proxy());
        assert!(table.routes()[1].target().is_proxy());
    }
}
