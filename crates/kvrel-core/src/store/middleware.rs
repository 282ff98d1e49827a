//! Module: store::middleware
//! Responsibility: command hooks around every store primitive.
//! Does not own: the primitives themselves; `MiddlewareStore` forwards to its inner store.
//!
//! Invariants:
//! - A middleware is attached to at most one store for its lifetime.
//! - `pre_command` hooks run in registration order, `post_command` hooks in reverse.

use crate::{
    model::ModelKey,
    store::{FieldStorage, Pk, Store, StoreError},
};
use derive_more::Display;
use once_cell::sync::OnceCell;
use std::{
    collections::BTreeSet,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};
use thiserror::Error as ThisError;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

///
/// StoreId
///
/// Process-unique id of one middleware-wrapped store.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[display("store#{_0}")]
pub struct StoreId(u64);

impl StoreId {
    fn next() -> Self {
        Self(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

///
/// MiddlewareError
///

#[derive(Debug, ThisError)]
pub enum MiddlewareError {
    #[error("middleware is attached to {attached}; cannot attach it to {requested}")]
    AlreadyAttached {
        attached: StoreId,
        requested: StoreId,
    },

    #[error("middleware at position {position} already appears earlier in the chain")]
    DuplicateInChain { position: usize },
}

///
/// Command
///
/// One store primitive as seen by middlewares.
///

#[derive(Clone, Copy, Debug)]
pub enum Command<'a> {
    Exists {
        model: &'a ModelKey,
        pk: &'a Pk,
    },
    Create {
        model: &'a ModelKey,
        pk: &'a Pk,
    },
    Get {
        model: &'a ModelKey,
        pk: &'a Pk,
        field: &'a str,
    },
    Set {
        model: &'a ModelKey,
        pk: &'a Pk,
        field: &'a str,
        value: &'a str,
    },
    Clear {
        model: &'a ModelKey,
        pk: &'a Pk,
        field: &'a str,
        expected: Option<&'a str>,
    },
    Members {
        model: &'a ModelKey,
        pk: &'a Pk,
        field: &'a str,
    },
    AddMember {
        model: &'a ModelKey,
        pk: &'a Pk,
        field: &'a str,
        member: &'a str,
    },
    RemoveMember {
        model: &'a ModelKey,
        pk: &'a Pk,
        field: &'a str,
        member: &'a str,
    },
    Delete {
        model: &'a ModelKey,
        pk: &'a Pk,
    },
    QueryByField {
        model: &'a ModelKey,
        field: &'a str,
        value: &'a str,
    },
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exists { model, pk } => write!(f, "exists {model}:{pk}"),
            Self::Create { model, pk } => write!(f, "create {model}:{pk}"),
            Self::Get { model, pk, field } => write!(f, "get {model}:{pk}.{field}"),
            Self::Set {
                model,
                pk,
                field,
                value,
            } => write!(f, "set {model}:{pk}.{field} {value}"),
            Self::Clear {
                model,
                pk,
                field,
                expected: None,
            } => write!(f, "clear {model}:{pk}.{field}"),
            Self::Clear {
                model,
                pk,
                field,
                expected: Some(expected),
            } => write!(f, "clear {model}:{pk}.{field} if {expected}"),
            Self::Members { model, pk, field } => write!(f, "members {model}:{pk}.{field}"),
            Self::AddMember {
                model,
                pk,
                field,
                member,
            } => write!(f, "add {model}:{pk}.{field} {member}"),
            Self::RemoveMember {
                model,
                pk,
                field,
                member,
            } => write!(f, "remove {model}:{pk}.{field} {member}"),
            Self::Delete { model, pk } => write!(f, "delete {model}:{pk}"),
            Self::QueryByField {
                model,
                field,
                value,
            } => write!(f, "query {model}.{field} = {value}"),
        }
    }
}

///
/// CommandContext
///
/// Per-command scratch space shared by the middleware chain.
///

#[derive(Debug, Default)]
pub struct CommandContext {
    number: Option<u64>,
    started_at: Option<Instant>,
}

impl CommandContext {
    #[must_use]
    pub const fn number(&self) -> Option<u64> {
        self.number
    }

    #[must_use]
    pub const fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn begin(&mut self, number: u64) {
        self.number = Some(number);
        self.started_at = Some(Instant::now());
    }
}

///
/// Attachment
///
/// Records the single store a middleware belongs to.
///

#[derive(Debug, Default)]
pub struct Attachment(OnceCell<StoreId>);

impl Attachment {
    /// Bind to `store`. Re-binding to the same store is a no-op.
    pub fn bind(&self, store: StoreId) -> Result<(), MiddlewareError> {
        let attached = *self.0.get_or_init(|| store);
        if attached == store {
            Ok(())
        } else {
            Err(MiddlewareError::AlreadyAttached {
                attached,
                requested: store,
            })
        }
    }

    #[must_use]
    pub fn store(&self) -> Option<StoreId> {
        self.0.get().copied()
    }
}

///
/// Middleware
///

pub trait Middleware: Send + Sync {
    /// The store this middleware is bound to, if any.
    fn attached(&self) -> Option<StoreId>;

    /// Called once when the middleware is installed on a store.
    fn attach(&self, store: StoreId) -> Result<(), MiddlewareError>;

    fn pre_command(&self, _command: &Command<'_>, _context: &mut CommandContext) {}

    fn post_command(
        &self,
        _command: &Command<'_>,
        _result: &dyn fmt::Debug,
        _context: &CommandContext,
    ) {
    }
}

///
/// MiddlewareStore
///
/// Applies a middleware chain to every primitive of an inner store.
///

pub struct MiddlewareStore<S> {
    inner: S,
    id: StoreId,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl<S: Store> MiddlewareStore<S> {
    pub fn new(inner: S, middlewares: Vec<Arc<dyn Middleware>>) -> Result<Self, MiddlewareError> {
        let id = StoreId::next();

        // the whole chain is checked before any middleware is bound
        for (position, middleware) in middlewares.iter().enumerate() {
            let ptr = Arc::as_ptr(middleware).cast::<()>();
            if middlewares[..position]
                .iter()
                .any(|earlier| Arc::as_ptr(earlier).cast::<()>() == ptr)
            {
                return Err(MiddlewareError::DuplicateInChain { position });
            }
            if let Some(attached) = middleware.attached() {
                return Err(MiddlewareError::AlreadyAttached {
                    attached,
                    requested: id,
                });
            }
        }
        for middleware in &middlewares {
            middleware.attach(id)?;
        }

        Ok(Self {
            inner,
            id,
            middlewares,
        })
    }

    #[must_use]
    pub const fn id(&self) -> StoreId {
        self.id
    }

    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    fn run<T: fmt::Debug>(
        &self,
        command: Command<'_>,
        f: impl FnOnce(&S) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut context = CommandContext::default();
        for middleware in &self.middlewares {
            middleware.pre_command(&command, &mut context);
        }

        let result = f(&self.inner);

        for middleware in self.middlewares.iter().rev() {
            middleware.post_command(&command, &result, &context);
        }

        result
    }
}

impl<S> fmt::Debug for MiddlewareStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareStore")
            .field("id", &self.id)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

impl<S: Store> Store for MiddlewareStore<S> {
    fn exists(&self, model: &ModelKey, pk: &Pk) -> Result<bool, StoreError> {
        self.run(Command::Exists { model, pk }, |s| s.exists(model, pk))
    }

    fn create(&self, model: &ModelKey, pk: &Pk) -> Result<bool, StoreError> {
        self.run(Command::Create { model, pk }, |s| s.create(model, pk))
    }

    fn get(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
    ) -> Result<Option<String>, StoreError> {
        self.run(Command::Get { model, pk, field }, |s| {
            s.get(model, pk, field, storage)
        })
    }

    fn set(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        value: &str,
    ) -> Result<Option<String>, StoreError> {
        self.run(
            Command::Set {
                model,
                pk,
                field,
                value,
            },
            |s| s.set(model, pk, field, storage, value),
        )
    }

    fn clear(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
    ) -> Result<bool, StoreError> {
        self.run(
            Command::Clear {
                model,
                pk,
                field,
                expected: None,
            },
            |s| s.clear(model, pk, field, storage),
        )
    }

    fn clear_if(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        expected: &str,
    ) -> Result<bool, StoreError> {
        self.run(
            Command::Clear {
                model,
                pk,
                field,
                expected: Some(expected),
            },
            |s| s.clear_if(model, pk, field, storage, expected),
        )
    }

    fn members(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
    ) -> Result<Vec<String>, StoreError> {
        self.run(Command::Members { model, pk, field }, |s| {
            s.members(model, pk, field, storage)
        })
    }

    fn add_member(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        member: &str,
        score: Option<f64>,
    ) -> Result<bool, StoreError> {
        self.run(
            Command::AddMember {
                model,
                pk,
                field,
                member,
            },
            |s| s.add_member(model, pk, field, storage, member, score),
        )
    }

    fn remove_member(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        member: &str,
    ) -> Result<bool, StoreError> {
        self.run(
            Command::RemoveMember {
                model,
                pk,
                field,
                member,
            },
            |s| s.remove_member(model, pk, field, storage, member),
        )
    }

    fn delete(
        &self,
        model: &ModelKey,
        pk: &Pk,
        fields: &[(&str, FieldStorage)],
    ) -> Result<bool, StoreError> {
        self.run(Command::Delete { model, pk }, |s| s.delete(model, pk, fields))
    }

    fn query_by_field(
        &self,
        model: &ModelKey,
        field: &str,
        value: &str,
    ) -> Result<BTreeSet<Pk>, StoreError> {
        self.run(
            Command::QueryByField {
                model,
                field,
                value,
            },
            |s| s.query_by_field(model, field, value),
        )
    }
}

///
/// LoggingMiddleware
///
/// Numbers every command and logs it through `log`, optionally with its
/// result and duration.
///

#[derive(Debug)]
pub struct LoggingMiddleware {
    log_results: bool,
    counter: AtomicU64,
    attachment: Attachment,
}

impl LoggingMiddleware {
    #[must_use]
    pub const fn new(log_results: bool) -> Self {
        Self {
            log_results,
            counter: AtomicU64::new(0),
            attachment: Attachment(OnceCell::new()),
        }
    }

    /// Number of commands seen so far.
    #[must_use]
    pub fn commands_logged(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Middleware for LoggingMiddleware {
    fn attached(&self) -> Option<StoreId> {
        self.attachment.store()
    }

    fn attach(&self, store: StoreId) -> Result<(), MiddlewareError> {
        self.attachment.bind(store)
    }

    fn pre_command(&self, command: &Command<'_>, context: &mut CommandContext) {
        let number = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        context.begin(number);

        log::info!("[#{number}] {command}");
    }

    fn post_command(
        &self,
        _command: &Command<'_>,
        result: &dyn fmt::Debug,
        context: &CommandContext,
    ) {
        if !self.log_results {
            return;
        }
        let number = context.number().unwrap_or_default();
        let micros = context
            .started_at()
            .map_or(0, |started| started.elapsed().as_micros());

        log::info!("[#{number}, in {micros}µs] {result:?}");
    }
}

///
/// TESTS
///
