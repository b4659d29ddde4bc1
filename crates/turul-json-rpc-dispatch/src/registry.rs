//! Method registry
//!
//! Methods are looked up by name through the [`MethodLookup`] trait, which is
//! implemented identically by [`Methods`], a plain `HashMap` of methods and a
//! `Vec` of methods identified by their own declared names.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::binder::{Arguments, Signature};
use crate::outcome::MethodResult;

/// A callable JSON-RPC method
#[async_trait]
pub trait RpcMethod<C>: Send + Sync {
    /// Name the method is registered under when no explicit name is given
    fn name(&self) -> &str;

    /// Declared parameter shape, consulted by the binder
    fn signature(&self) -> &Signature;

    /// Run the method body
    async fn call(&self, args: Arguments<C>) -> MethodResult;
}

/// Shared handle to a registered method
pub type MethodRef<C> = Arc<dyn RpcMethod<C>>;

/// Method backed by an async closure
pub struct FnMethod<C, F> {
    name: String,
    signature: Signature,
    handler: F,
    _context: PhantomData<fn(Arguments<C>)>,
}

#[async_trait]
impl<C, F, Fut> RpcMethod<C> for FnMethod<C, F>
where
    C: Send + 'static,
    F: Fn(Arguments<C>) -> Fut + Send + Sync,
    Fut: Future<Output = MethodResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    async fn call(&self, args: Arguments<C>) -> MethodResult {
        (self.handler)(args).await
    }
}

/// Method backed by a synchronous closure
pub struct SyncFnMethod<C, F> {
    name: String,
    signature: Signature,
    handler: F,
    _context: PhantomData<fn(Arguments<C>)>,
}

#[async_trait]
impl<C, F> RpcMethod<C> for SyncFnMethod<C, F>
where
    C: Send + 'static,
    F: Fn(Arguments<C>) -> MethodResult + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    async fn call(&self, args: Arguments<C>) -> MethodResult {
        (self.handler)(args)
    }
}

/// Wrap an async closure as a method
pub fn method<C, F, Fut>(
    name: impl Into<String>,
    signature: Signature,
    handler: F,
) -> FnMethod<C, F>
where
    F: Fn(Arguments<C>) -> Fut,
    Fut: Future<Output = MethodResult>,
{
    FnMethod {
        name: name.into(),
        signature,
        handler,
        _context: PhantomData,
    }
}

/// Wrap a synchronous closure as a method
pub fn sync_method<C, F>(
    name: impl Into<String>,
    signature: Signature,
    handler: F,
) -> SyncFnMethod<C, F>
where
    F: Fn(Arguments<C>) -> MethodResult,
{
    SyncFnMethod {
        name: name.into(),
        signature,
        handler,
        _context: PhantomData,
    }
}

/// Name -> method lookup contract shared by every registry shape
pub trait MethodLookup<C>: Send + Sync {
    fn lookup(&self, name: &str) -> Option<MethodRef<C>>;
}

/// Map-backed method registry.
///
/// Registering a name twice replaces the earlier method: the last
/// registration wins and the replaced method is handed back.
pub struct Methods<C = ()> {
    methods: HashMap<String, MethodRef<C>>,
}

impl<C> Methods<C> {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register a method under an explicit name
    pub fn register<M>(&mut self, name: impl Into<String>, method: M) -> Option<MethodRef<C>>
    where
        M: RpcMethod<C> + 'static,
    {
        self.register_arc(name, Arc::new(method))
    }

    pub fn register_arc(
        &mut self,
        name: impl Into<String>,
        method: MethodRef<C>,
    ) -> Option<MethodRef<C>> {
        self.methods.insert(name.into(), method)
    }

    /// Register a method under its own declared name (builder style)
    pub fn with<M>(mut self, method: M) -> Self
    where
        M: RpcMethod<C> + 'static,
    {
        let name = method.name().to_string();
        self.register(name, method);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<MethodRef<C>> {
        self.methods.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered method names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<C> Default for Methods<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for Methods<C> {
    fn clone(&self) -> Self {
        Self {
            methods: self.methods.clone(),
        }
    }
}

impl<C> FromIterator<MethodRef<C>> for Methods<C> {
    fn from_iter<I: IntoIterator<Item = MethodRef<C>>>(iter: I) -> Self {
        let mut methods = Self::new();
        for method in iter {
            let name = method.name().to_string();
            methods.register_arc(name, method);
        }
        methods
    }
}

impl<C> MethodLookup<C> for Methods<C> {
    fn lookup(&self, name: &str) -> Option<MethodRef<C>> {
        self.methods.get(name).cloned()
    }
}

impl<C> MethodLookup<C> for HashMap<String, MethodRef<C>> {
    fn lookup(&self, name: &str) -> Option<MethodRef<C>> {
        self.get(name).cloned()
    }
}

/// Ordered list of methods; the last one declaring `name` wins
impl<C> MethodLookup<C> for Vec<MethodRef<C>> {
    fn lookup(&self, name: &str) -> Option<MethodRef<C>> {
        self.iter().rev().find(|m| m.name() == name).cloned()
    }
}

impl<C, L> MethodLookup<C> for Arc<L>
where
    L: MethodLookup<C> + ?Sized,
{
    fn lookup(&self, name: &str) -> Option<MethodRef<C>> {
        (**self).lookup(name)
    }
}

/// Opt-in process-wide registry.
///
/// The dispatch core never reads it implicitly; pass [`snapshot()`] to a
/// dispatcher explicitly.
pub mod global {
    use once_cell::sync::Lazy;
    use parking_lot::RwLock;

    use super::{MethodRef, Methods, RpcMethod};

    static GLOBAL_METHODS: Lazy<RwLock<Methods<()>>> = Lazy::new(|| RwLock::new(Methods::new()));

    /// Register a method under its own name
    pub fn register<M>(method: M) -> Option<MethodRef<()>>
    where
        M: RpcMethod<()> + 'static,
    {
        let name = method.name().to_string();
        GLOBAL_METHODS.write().register(name, method)
    }

    /// Copy of the current registry, safe to dispatch against
    pub fn snapshot() -> Methods<()> {
        GLOBAL_METHODS.read().clone()
    }

    pub fn clear() {
        *GLOBAL_METHODS.write() = Methods::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind;
    use crate::outcome::Outcome;
    use crate::request::Params;
    use serde_json::json;
    use std::future::ready;

    fn pong(_: Arguments<()>) -> MethodResult {
        Ok(Outcome::success("pong"))
    }

    fn nothing(_: Arguments<()>) -> MethodResult {
        Ok(Outcome::null())
    }

    fn double(args: Arguments<()>) -> MethodResult {
        Ok(Outcome::success(args.parse::<i64>("n")? * 2))
    }

    fn ping() -> MethodRef<()> {
        Arc::new(sync_method("ping", Signature::new(), pong))
    }

    fn echo(reply: &'static str) -> MethodRef<()> {
        let handler = move |_: Arguments<()>| ready(Ok(Outcome::success(reply)));
        Arc::new(method("echo", Signature::new(), handler))
    }

    #[tokio::test]
    async fn test_register_and_call() {
        let doubler = sync_method("double", Signature::positional(["n"]), double);
        let methods = Methods::new().with(doubler);

        let found = methods.lookup("double").unwrap();
        let params = Params::Positional(vec![json!(21)]);
        let args = bind(params, found.signature(), None).unwrap();
        assert_eq!(found.call(args).await.unwrap(), Outcome::success(42));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut methods = Methods::new();
        let first = sync_method("a", Signature::new(), nothing);
        assert!(methods.register("echo", first).is_none());
        let replaced = methods.register_arc("echo", echo("second"));
        assert_eq!(replaced.unwrap().name(), "a");
        assert_eq!(methods.lookup("echo").unwrap().name(), "echo");
        assert_eq!(methods.len(), 1);
    }

    #[test]
    fn test_lookup_shapes_agree() {
        let registry: Methods = vec![ping(), echo("hi")].into_iter().collect();
        let mut map: HashMap<String, MethodRef<()>> = HashMap::new();
        map.insert("ping".to_string(), ping());
        map.insert("echo".to_string(), echo("hi"));
        let list: Vec<MethodRef<()>> = vec![ping(), echo("hi")];

        let shapes: [&dyn MethodLookup<()>; 3] = [&registry, &map, &list];
        for shape in shapes {
            let found = shape.lookup("ping").map(|m| m.name().to_string());
            assert_eq!(found.as_deref(), Some("ping"));
            assert!(shape.lookup("missing").is_none());
        }
        assert_eq!(registry.names(), ["echo", "ping"]);
    }

    #[tokio::test]
    async fn test_list_lookup_prefers_last_match() {
        let list: Vec<MethodRef<()>> = vec![echo("first"), echo("second")];
        let found = list.lookup("echo").unwrap();
        let args = bind(Params::None, found.signature(), None).unwrap();
        assert_eq!(found.call(args).await.unwrap(), Outcome::success("second"));
    }

    #[test]
    fn test_global_registry_is_opt_in() {
        global::clear();
        assert!(global::snapshot().is_empty());
        global::register(sync_method("ping", Signature::new(), pong));
        let snapshot = global::snapshot();
        assert!(snapshot.contains("ping"));
        global::clear();
        assert!(snapshot.contains("ping"));
    }
}
