//! Decorator chain
//!
//! Decorators are middleware around one trial attempt. A chain is an ordered
//! list of decorators ending in a terminal call into the selected trial; each
//! decorator receives a [`Next`] continuation for the rest of the chain.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::InvocationContext;
use crate::domain::TrialError;

/// Type-erased trial return value
pub type TrialOutput = Box<dyn Any + Send>;

pub type TrialResult = Result<TrialOutput, TrialError>;

/// The innermost call of a chain, into the selected trial implementation
pub type Terminal =
    Arc<dyn Fn(&InvocationContext) -> BoxFuture<'static, TrialResult> + Send + Sync>;

/// Middleware around a single trial attempt.
///
/// Implementations must pass the context on to `next` unchanged, and must
/// return errors from `next` unless handling them is their purpose.
/// Skipping `next` short-circuits every inner decorator and the trial.
#[async_trait]
pub trait TrialDecorator: Send + Sync {
    async fn invoke(&self, context: &InvocationContext, next: Next) -> TrialResult;
}

/// Produces one decorator instance per attempt
pub trait DecoratorFactory: Send + Sync {
    fn name(&self) -> &str;

    /// Position in the chain; lower runs further out
    fn order(&self) -> i32 {
        0
    }

    fn create(&self) -> Box<dyn TrialDecorator>;
}

/// Continuation for the remainder of a chain
pub struct Next {
    chain: Arc<[Box<dyn TrialDecorator>]>,
    index: usize,
    terminal: Terminal,
}

impl Next {
    /// Run the rest of the chain
    pub async fn run(self, context: &InvocationContext) -> TrialResult {
        match self.chain.get(self.index) {
            Some(decorator) => {
                let next = Next {
                    chain: self.chain.clone(),
                    index: self.index + 1,
                    terminal: self.terminal.clone(),
                };
                decorator.invoke(context, next).await
            }
            None => (self.terminal)(context).await,
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &(self.chain.len() - self.index))
            .finish()
    }
}

/// An ordered decorator chain, instantiated for one attempt
#[derive(Clone)]
pub struct DecoratorChain {
    decorators: Arc<[Box<dyn TrialDecorator>]>,
    names: Vec<String>,
}

impl DecoratorChain {
    /// Instantiate one decorator per factory, sorted ascending by order.
    ///
    /// The sort is stable, so factories with equal order keep their input order.
    pub fn from_factories<'a, I>(factories: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<dyn DecoratorFactory>>,
    {
        let mut factories: Vec<&Arc<dyn DecoratorFactory>> = factories.into_iter().collect();
        factories.sort_by_key(|factory| factory.order());

        let names = factories.iter().map(|f| f.name().to_string()).collect();
        let decorators: Vec<Box<dyn TrialDecorator>> =
            factories.iter().map(|factory| factory.create()).collect();

        Self {
            decorators: Arc::from(decorators),
            names,
        }
    }

    /// Chain over already-created decorators, outermost first
    pub fn from_decorators(decorators: Vec<Box<dyn TrialDecorator>>) -> Self {
        let names = (0..decorators.len()).map(|i| format!("#{}", i)).collect();

        Self {
            decorators: Arc::from(decorators),
            names,
        }
    }

    /// Decorator names, outermost first
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.decorators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    /// Run the chain around `terminal`
    pub async fn invoke(&self, context: &InvocationContext, terminal: Terminal) -> TrialResult {
        Next {
            chain: self.decorators.clone(),
            index: 0,
            terminal,
        }
        .run(context)
        .await
    }
}

impl fmt::Debug for DecoratorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratorChain")
            .field("decorators", &self.names)
            .finish()
    }
}

/// Recover the concrete return value from a type-erased output
pub fn downcast_output<R: 'static>(output: TrialOutput) -> Result<R, TrialError> {
    output
        .downcast::<R>()
        .map(|value| *value)
        .map_err(|_| {
            TrialError::internal(format!(
                "trial returned a value that is not a {}",
                std::any::type_name::<R>()
            ))
        })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::domain::ServiceType;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Recording {
        label: String,
        journal: Journal,
        short_circuit: bool,
    }

    #[async_trait]
    impl TrialDecorator for Recording {
        async fn invoke(&self, context: &InvocationContext, next: Next) -> TrialResult {
            self.journal.lock().push(format!("enter {}", self.label));

            if self.short_circuit {
                return Ok(Box::new(format!("short-circuit by {}", self.label)));
            }

            let result = next.run(context).await;
            self.journal.lock().push(format!("exit {}", self.label));
            result
        }
    }

    struct RecordingFactory {
        label: &'static str,
        order: i32,
        journal: Journal,
        short_circuit: bool,
        created: AtomicUsize,
    }

    impl RecordingFactory {
        fn new(label: &'static str, order: i32, journal: &Journal) -> Self {
            Self {
                label,
                order,
                journal: journal.clone(),
                short_circuit: false,
                created: AtomicUsize::new(0),
            }
        }
    }

    impl DecoratorFactory for RecordingFactory {
        fn name(&self) -> &str {
            self.label
        }

        fn order(&self) -> i32 {
            self.order
        }

        fn create(&self) -> Box<dyn TrialDecorator> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Box::new(Recording {
                label: self.label.to_string(),
                journal: self.journal.clone(),
                short_circuit: self.short_circuit,
            })
        }
    }

    fn terminal(journal: &Journal) -> Terminal {
        let journal = journal.clone();
        Arc::new(
            move |_context: &InvocationContext| -> BoxFuture<'static, TrialResult> {
                journal.lock().push("trial".to_string());
                Box::pin(async { Ok(Box::new("done".to_string()) as TrialOutput) })
            },
        )
    }

    fn context() -> InvocationContext {
        InvocationContext::new(ServiceType::new("Checkout"), "pay", "control")
    }

    #[tokio::test]
    async fn test_ascending_order_with_stable_ties() {
        let journal: Journal = Arc::default();
        let factories: Vec<Arc<dyn DecoratorFactory>> = vec![
            Arc::new(RecordingFactory::new("late", 20, &journal)),
            Arc::new(RecordingFactory::new("tie-first", 10, &journal)),
            Arc::new(RecordingFactory::new("early", -5, &journal)),
            Arc::new(RecordingFactory::new("tie-second", 10, &journal)),
        ];

        let chain = DecoratorChain::from_factories(&factories);
        assert_eq!(chain.names(), &["early", "tie-first", "tie-second", "late"]);

        let output = chain.invoke(&context(), terminal(&journal)).await.unwrap();
        assert_eq!(downcast_output::<String>(output).unwrap(), "done");

        assert_eq!(
            *journal.lock(),
            vec![
                "enter early",
                "enter tie-first",
                "enter tie-second",
                "enter late",
                "trial",
                "exit late",
                "exit tie-second",
                "exit tie-first",
                "exit early",
            ]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_inner_decorators_and_trial() {
        let journal: Journal = Arc::default();
        let mut blocker = RecordingFactory::new("blocker", 5, &journal);
        blocker.short_circuit = true;

        let factories: Vec<Arc<dyn DecoratorFactory>> = vec![
            Arc::new(RecordingFactory::new("inner", 10, &journal)),
            Arc::new(blocker),
            Arc::new(RecordingFactory::new("outer", 0, &journal)),
        ];

        let chain = DecoratorChain::from_factories(&factories);
        let output = chain.invoke(&context(), terminal(&journal)).await.unwrap();

        assert_eq!(
            downcast_output::<String>(output).unwrap(),
            "short-circuit by blocker"
        );
        assert_eq!(
            *journal.lock(),
            vec!["enter outer", "enter blocker", "exit outer"]
        );
    }

    #[tokio::test]
    async fn test_factories_create_per_chain() {
        let journal: Journal = Arc::default();
        let factory = Arc::new(RecordingFactory::new("only", 0, &journal));
        let factories: Vec<Arc<dyn DecoratorFactory>> = vec![factory.clone()];

        DecoratorChain::from_factories(&factories);
        DecoratorChain::from_factories(&factories);

        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_chain_runs_terminal() {
        let journal: Journal = Arc::default();
        let chain = DecoratorChain::from_decorators(Vec::new());

        assert!(chain.is_empty());
        chain.invoke(&context(), terminal(&journal)).await.unwrap();
        assert_eq!(*journal.lock(), vec!["trial"]);
    }

    #[test]
    fn test_downcast_mismatch() {
        let output: TrialOutput = Box::new(5u32);
        assert!(matches!(
            downcast_output::<String>(output),
            Err(TrialError::Internal { .. })
        ));
    }
}
