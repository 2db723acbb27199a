//! Error recovery policies

use serde::{Deserialize, Serialize};

/// What the dispatcher does when the selected trial fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OnErrorPolicy {
    /// Propagate the failure unchanged
    #[default]
    Throw,
    /// Replay once against the default trial, unless the default just failed
    RedirectAndReplayDefault,
    /// Replay every other trial in registration order until one succeeds
    RedirectAndReplayAny,
    /// Replay once against a single fallback trial
    RedirectAndReplay { fallback_key: String },
    /// Replay against the fallback trials in the declared order
    RedirectAndReplayOrdered { fallback_keys: Vec<String> },
}

impl OnErrorPolicy {
    /// Keys of trials this policy refers to explicitly
    pub fn referenced_keys(&self) -> &[String] {
        match self {
            Self::RedirectAndReplay { fallback_key } => std::slice::from_ref(fallback_key),
            Self::RedirectAndReplayOrdered { fallback_keys } => fallback_keys,
            _ => &[],
        }
    }

    /// Trials to replay, in order, after `failed` failed.
    ///
    /// `failed` is `None` when selection itself failed and no trial ran. Keys
    /// already attempted are skipped, as are duplicates.
    pub fn replay_plan<'a>(
        &'a self,
        failed: Option<&str>,
        default_key: &'a str,
        trial_keys: &'a [String],
    ) -> Vec<&'a str> {
        let candidates: Vec<&str> = match self {
            Self::Throw => Vec::new(),
            Self::RedirectAndReplayDefault => vec![default_key],
            Self::RedirectAndReplayAny => trial_keys.iter().map(String::as_str).collect(),
            Self::RedirectAndReplay { fallback_key } => vec![fallback_key.as_str()],
            Self::RedirectAndReplayOrdered { fallback_keys } => {
                fallback_keys.iter().map(String::as_str).collect()
            }
        };

        let mut plan: Vec<&str> = Vec::with_capacity(candidates.len());

        for key in candidates {
            if Some(key) == failed || plan.contains(&key) {
                continue;
            }
            plan.push(key);
        }

        plan
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Throw => "throw",
            Self::RedirectAndReplayDefault => "redirect_and_replay_default",
            Self::RedirectAndReplayAny => "redirect_and_replay_any",
            Self::RedirectAndReplay { .. } => "redirect_and_replay",
            Self::RedirectAndReplayOrdered { .. } => "redirect_and_replay_ordered",
        }
    }
}
