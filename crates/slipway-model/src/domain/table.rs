use serde::{Deserialize, Serialize};

use crate::Route;

/// Named, ordered set of routes.
///
/// Tables are the unit of replacement in the store: an update always overwrites
/// every route of the table with the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: Vec::new(),
        }
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// First route whose virtual name matches `name`.
    pub fn lookup(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches_name(name))
    }

    /// First route bound to the given virtual address.
    pub fn lookup_ip(&self, ip: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.ip == ip)
    }

    /// Routes that must be redirected to the local proxy.
    pub fn redirects(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(|r| r.is_redirect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Protocol, RouteAction};

    fn sample() -> Table {
        Table::new("cluster")
            .with_route(Route {
                name: "web.default".into(),
                ip: "10.0.0.5".into(),
                target: "172.16.0.10:8080".into(),
                ..Default::default()
            })
            .with_route(Route {
                name: "dns.default".into(),
                proto: Protocol::Udp,
                ip: "10.0.0.6".into(),
                action: RouteAction::DontRedirect,
                ..Default::default()
            })
    }

    #[test]
    fn lookup_by_name_and_ip() {
        let table = sample();
        assert_eq!(table.lookup("WEB.default.").unwrap().ip, "10.0.0.5");
        assert_eq!(table.lookup_ip("10.0.0.6").unwrap().name, "dns.default");
        assert!(table.lookup("missing").is_none());
    }

    #[test]
    fn redirects_skip_dont_redirect_routes() {
        let table = sample();
        let names: Vec<_> = table.redirects().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["web.default"]);
    }

    #[test]
    fn decodes_table_without_routes() {
        let table: Table = serde_json::from_str(r#"{"name":"empty"}"#).unwrap();
        assert_eq!(table, Table::new("empty"));
    }
}
