use serde_json::Value;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// Which Supabase surface a request goes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// `/rest/v1/<table>`
    Rest(String),
    /// `/rest/v1/rpc/<function>`
    Rpc(String),
    /// `/functions/v1/<name>`
    Function(String),
}

impl Target {
    pub fn path(&self) -> String {
        match self {
            Target::Rest(table) => format!("/rest/v1/{table}"),
            Target::Rpc(function) => format!("/rest/v1/rpc/{function}"),
            Target::Function(name) => format!("/functions/v1/{name}"),
        }
    }
}

/// A backend call, independent of the HTTP client that executes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub target: Target,
    /// PostgREST query pairs, e.g. `("id", "eq.order-1")`, `("select", "*")`.
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Ask PostgREST for a single object instead of an array.
    pub single: bool,
}

impl ApiRequest {
    fn new(method: Method, target: Target) -> Self {
        Self {
            method,
            target,
            query: Vec::new(),
            body: None,
            single: false,
        }
    }

    pub fn select(table: impl Into<String>, columns: impl Into<String>) -> Self {
        Self::new(Method::Get, Target::Rest(table.into())).param("select", columns)
    }

    pub fn update(table: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Patch, Target::Rest(table.into())).body(body)
    }

    pub fn insert(table: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, Target::Rest(table.into())).body(body)
    }

    pub fn rpc(function: impl Into<String>, args: Value) -> Self {
        Self::new(Method::Post, Target::Rpc(function.into())).body(args)
    }

    pub fn function(name: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, Target::Function(name.into())).body(body)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// PostgREST equality filter: `column=eq.value`.
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("eq.{value}"))
    }

    pub fn order_by(self, column: &str, descending: bool) -> Self {
        let dir = if descending { "desc" } else { "asc" };
        self.param("order", format!("{column}.{dir}"))
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Display for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method.as_str(), self.target.path())
    }
}
