//! Trial dispatcher
//!
//! Service adapters forward every call into [`Dispatcher::dispatch`], which
//! resolves the trial key through the registration's selection mode, runs the
//! selected trial inside a fresh decorator chain, and applies the
//! registration's [`OnErrorPolicy`] when the attempt fails.
//!
//! [`OnErrorPolicy`]: crate::domain::OnErrorPolicy

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    downcast_output, DecoratorChain, DecoratorFactory, Invocation, InvocationContext, Terminal,
    TrialOutput, TrialResult,
};
use crate::domain::conflict::ConflictDetector;
use crate::domain::selection::{
    SelectionContext, SelectionModeProvider, SelectionModeRegistry, StickyHasher,
};
use crate::domain::{
    Clock, DefaultNamingConvention, ExperimentDefinition, ExperimentRegistration,
    NamingConvention, ServiceType, SystemClock, TrialError,
};

/// A registration resolved at composition time
struct RegistrationEntry {
    definition: ExperimentDefinition,
    selector_name: String,
    provider: Arc<dyn SelectionModeProvider>,
    decorators: Vec<Arc<dyn DecoratorFactory>>,
    /// The typed `ExperimentRegistration<S>`
    registration: Arc<dyn Any + Send + Sync>,
}

/// Runtime entry point for every intercepted call.
///
/// The registration table is immutable after [`DispatcherBuilder::build`];
/// concurrent calls share nothing mutable.
pub struct Dispatcher {
    registrations: HashMap<ServiceType, Vec<RegistrationEntry>>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn builder(selection_modes: SelectionModeRegistry) -> DispatcherBuilder {
        DispatcherBuilder::new(selection_modes)
    }

    /// Dispatch one call of service `S`.
    ///
    /// `call` is invoked with the selected trial implementation, once per
    /// attempt; replays call it again with another trial.
    pub async fn dispatch<S, R, F, Fut>(
        &self,
        invocation: Invocation,
        call: F,
    ) -> Result<R, TrialError>
    where
        S: ?Sized + Send + Sync + 'static,
        R: Send + 'static,
        F: Fn(Arc<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, TrialError>> + Send + 'static,
    {
        let service_type = ServiceType::of::<S>();
        let now = self.clock.now();
        let entry = self.resolve_entry(&service_type, now)?;
        let active = entry.definition.is_active_at(now);

        let registration = entry
            .registration
            .downcast_ref::<ExperimentRegistration<S>>()
            .ok_or_else(|| {
                TrialError::internal(format!(
                    "registration for '{}' has an unexpected type",
                    service_type
                ))
            })?;

        let invocation_id = Uuid::new_v4();
        let call = Arc::new(call);
        let definition = &entry.definition;
        let mut attempt = 0;

        let (failed_key, mut last_error) =
            match self.select_trial_key(entry, active, &invocation).await {
                Ok(trial_key) => {
                    attempt += 1;
                    match self
                        .execute_attempt(
                            entry,
                            registration,
                            &invocation,
                            invocation_id,
                            &trial_key,
                            attempt,
                            &call,
                        )
                        .await
                    {
                        Ok(value) => return Ok(value),
                        Err(error) => (Some(trial_key), error),
                    }
                }
                Err(error) => {
                    warn!(
                        service = %service_type,
                        mode = %definition.selection_mode,
                        error = %error,
                        "Trial selection failed"
                    );
                    (None, error)
                }
            };

        let plan = definition.on_error.replay_plan(
            failed_key.as_deref(),
            &definition.default_trial_key,
            &definition.trial_keys,
        );

        for trial_key in plan {
            if last_error.is_cancelled() || invocation.cancellation().is_cancelled() {
                debug!(
                    service = %service_type,
                    method = %invocation.method(),
                    "Invocation cancelled, not replaying"
                );
                break;
            }

            warn!(
                service = %service_type,
                method = %invocation.method(),
                policy = definition.on_error.name(),
                trial_key = %trial_key,
                attempt = attempt + 1,
                error = %last_error,
                "Trial failed, replaying"
            );

            attempt += 1;
            match self
                .execute_attempt(
                    entry,
                    registration,
                    &invocation,
                    invocation_id,
                    trial_key,
                    attempt,
                    &call,
                )
                .await
            {
                Ok(value) => {
                    info!(
                        service = %service_type,
                        method = %invocation.method(),
                        trial_key = %trial_key,
                        attempt,
                        "Replay succeeded"
                    );
                    return Ok(value);
                }
                Err(error) => last_error = error,
            }
        }

        if attempt > 1 {
            warn!(
                service = %service_type,
                method = %invocation.method(),
                policy = definition.on_error.name(),
                attempts = attempt,
                error = %last_error,
                "All trial attempts failed"
            );
        }

        Err(last_error)
    }

    /// Whether any registration exists for service `S`
    pub fn is_registered<S: ?Sized + 'static>(&self) -> bool {
        self.registrations.contains_key(&ServiceType::of::<S>())
    }

    /// Definitions of every registration, for diagnostics
    pub fn definitions(&self) -> impl Iterator<Item = &ExperimentDefinition> {
        self.registrations
            .values()
            .flat_map(|entries| entries.iter().map(|entry| &entry.definition))
    }

    /// Selector name resolved for the active registration of `service_type`
    pub fn selector_name(&self, service_type: &ServiceType) -> Option<&str> {
        self.resolve_entry(service_type, self.clock.now())
            .ok()
            .map(|entry| entry.selector_name.as_str())
    }

    /// The registration active at `now`, or the first one when none is
    fn resolve_entry(
        &self,
        service_type: &ServiceType,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<&RegistrationEntry, TrialError> {
        let entries = self
            .registrations
            .get(service_type)
            .filter(|entries| !entries.is_empty())
            .ok_or_else(|| TrialError::no_registration(service_type.as_str()))?;

        Ok(entries
            .iter()
            .find(|entry| entry.definition.is_active_at(now))
            .unwrap_or(&entries[0]))
    }

    async fn select_trial_key(
        &self,
        entry: &RegistrationEntry,
        active: bool,
        invocation: &Invocation,
    ) -> Result<String, TrialError> {
        let definition = &entry.definition;
        let default_key = &definition.default_trial_key;

        if !active {
            debug!(
                service = %definition.service_type,
                "Experiment outside its active window, using default trial"
            );
            return Ok(default_key.clone());
        }

        if let Some(percentage) = definition.traffic_percentage {
            let salt = format!("{}:allocation", entry.selector_name);
            let enrolled = invocation
                .scope()
                .identity()
                .is_some_and(|identity| StickyHasher::bucket(identity, &salt) < percentage);

            if !enrolled {
                debug!(
                    service = %definition.service_type,
                    percentage,
                    "Caller outside traffic allocation, using default trial"
                );
                return Ok(default_key.clone());
            }
        }

        let context = SelectionContext::new(
            &definition.service_type,
            &entry.selector_name,
            default_key,
            &definition.trial_keys,
            invocation.scope(),
        );

        let selected = entry.provider.select_trial_key(&context).await?;

        match selected {
            Some(key) if definition.has_trial(&key) => {
                debug!(
                    service = %definition.service_type,
                    selector = %entry.selector_name,
                    trial_key = %key,
                    "Trial selected"
                );
                Ok(key)
            }
            Some(key) => {
                debug!(
                    service = %definition.service_type,
                    selector = %entry.selector_name,
                    trial_key = %key,
                    "Selected trial is not registered, using default trial"
                );
                Ok(default_key.clone())
            }
            None => Ok(default_key.clone()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_attempt<S, R, F, Fut>(
        &self,
        entry: &RegistrationEntry,
        registration: &ExperimentRegistration<S>,
        invocation: &Invocation,
        invocation_id: Uuid,
        trial_key: &str,
        attempt: u32,
        call: &Arc<F>,
    ) -> Result<R, TrialError>
    where
        S: ?Sized + Send + Sync + 'static,
        R: Send + 'static,
        F: Fn(Arc<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, TrialError>> + Send + 'static,
    {
        let trial = registration.trial(trial_key).cloned().ok_or_else(|| {
            TrialError::internal(format!(
                "trial '{}' of '{}' is not registered",
                trial_key, entry.definition.service_type
            ))
        })?;

        let context = InvocationContext::for_attempt(
            invocation_id,
            entry.definition.service_type.clone(),
            invocation,
            trial_key,
            attempt,
        )
        .with_selector_name(entry.selector_name.clone())
        .with_experiment_name(entry.definition.experiment_name.clone());

        let call = call.clone();
        let terminal: Terminal = Arc::new(
            move |context: &InvocationContext| -> BoxFuture<'static, TrialResult> {
                let future = (*call)(trial.clone());
                let cancellation = context.cancellation().clone();

                Box::pin(async move {
                    tokio::select! {
                        biased;
                        _ = cancellation.cancelled() => Err(TrialError::Cancelled),
                        result = future => result.map(|value| Box::new(value) as TrialOutput),
                    }
                })
            },
        );

        let chain = DecoratorChain::from_factories(&entry.decorators);
        let output = chain.invoke(&context, terminal).await?;

        downcast_output::<R>(output)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("services", &self.registrations.len())
            .field("clock", &self.clock)
            .finish()
    }
}

struct PendingRegistration {
    definition: ExperimentDefinition,
    decorators: Vec<Arc<dyn DecoratorFactory>>,
    registration: Arc<dyn Any + Send + Sync>,
}

/// Composition root for a [`Dispatcher`]
pub struct DispatcherBuilder {
    selection_modes: SelectionModeRegistry,
    decorators: Vec<Arc<dyn DecoratorFactory>>,
    naming: Arc<dyn NamingConvention>,
    clock: Arc<dyn Clock>,
    pending: Vec<PendingRegistration>,
}

impl DispatcherBuilder {
    fn new(selection_modes: SelectionModeRegistry) -> Self {
        Self {
            selection_modes,
            decorators: Vec::new(),
            naming: Arc::new(DefaultNamingConvention),
            clock: Arc::new(SystemClock),
            pending: Vec::new(),
        }
    }

    /// Add a registration; several registrations of one service may coexist
    /// when their time windows do not overlap
    pub fn register<S>(mut self, registration: ExperimentRegistration<S>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.pending.push(PendingRegistration {
            definition: registration.definition().clone(),
            decorators: registration.decorators().to_vec(),
            registration: Arc::new(registration),
        });
        self
    }

    /// Add a decorator applied to every service
    pub fn with_decorator(mut self, factory: Arc<dyn DecoratorFactory>) -> Self {
        self.decorators.push(factory);
        self
    }

    pub fn with_naming_convention(mut self, naming: Arc<dyn NamingConvention>) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate every registration and freeze the table.
    ///
    /// Fails with all conflicts at once, or with the first selection mode
    /// that has no provider.
    pub fn build(self) -> Result<Dispatcher, TrialError> {
        let definitions: Vec<ExperimentDefinition> = self
            .pending
            .iter()
            .map(|pending| pending.definition.clone())
            .collect();

        ConflictDetector::validate_or_throw(&definitions)?;

        let mut registrations: HashMap<ServiceType, Vec<RegistrationEntry>> = HashMap::new();

        for pending in self.pending {
            let definition = pending.definition;
            let provider = self.selection_modes.resolve(&definition.selection_mode)?;
            let selector_name = definition.selector_name.clone().unwrap_or_else(|| {
                provider.default_selector_name(&definition.service_type, self.naming.as_ref())
            });

            let decorators = self
                .decorators
                .iter()
                .chain(pending.decorators.iter())
                .cloned()
                .collect();

            info!(
                service = %definition.service_type,
                mode = %definition.selection_mode,
                selector = %selector_name,
                trials = definition.trial_keys.len(),
                policy = definition.on_error.name(),
                "Registered experiment"
            );

            registrations
                .entry(definition.service_type.clone())
                .or_default()
                .push(RegistrationEntry {
                    definition,
                    selector_name,
                    provider,
                    decorators,
                    registration: pending.registration,
                });
        }

        Ok(Dispatcher {
            registrations,
            clock: self.clock,
        })
    }
}
