//! # Current User Example
//!
//! Fetches the signed-in user's profile through the authenticated interceptor.
//!
//! This example showcases:
//! - Embedding [`AuthenticatedAction`] in an application action type
//! - Lifecycle actions (`Init` → `Success` | `Error`) built by the request payload
//! - Policy checks with wildcard matching on the loaded profile
//!
//! ## Example
//!
//! ```no_run
//! use current_user::{ProfileAction, ProfileReducer, ProfileState, fetch_current_user};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokenflow_auth::{AuthenticatedInterceptor, FileStorage, InterceptorConfig, NoNavigation, ReqwestExecutor};
//! use tokenflow_runtime::Store;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let interceptor = AuthenticatedInterceptor::from_config(
//!     InterceptorConfig::from_env()?,
//!     ReqwestExecutor::new(),
//!     Arc::new(FileStorage::new("credentials.json")),
//!     Arc::new(NoNavigation),
//! )?;
//! let store = Store::new(ProfileState::default(), ProfileReducer, ()).with_middleware(interceptor);
//!
//! store
//!     .send_and_wait_for(fetch_current_user(), ProfileAction::is_outcome, Duration::from_secs(10))
//!     .await?;
//! let allowed = store.state(|s| s.can("edit", "post")).await;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokenflow_auth::{
    AuthenticatedAction, AuthenticatedActionKind, AuthenticatedRequest, HttpResponse, RequestConfig,
    RequestError, RequestErrorKind, authenticated_request,
};
use tokenflow_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Path of the current-user endpoint.
pub const CURRENT_USER_PATH: &str = "/api/v1/me";

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Account id
    pub id: String,
    /// Email address
    pub email: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

/// Permission to perform `action` on `resource`. `*` matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Resource name, or `*`
    pub resource: String,
    /// Action name, or `*`
    pub action: String,
}

impl Policy {
    /// Whether this policy grants `action` on `resource`.
    #[must_use]
    pub fn allows(&self, action: &str, resource: &str) -> bool {
        (self.action == "*" || self.action == action)
            && (self.resource == "*" || self.resource == resource)
    }
}

/// Body of a successful current-user response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The signed-in user
    pub user: User,
    /// Everything the user may do
    pub policies: Vec<Policy>,
}

/// Body of a failed API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human readable reason
    pub reason: String,
}

/// Profile state.
#[derive(Debug, Clone, Default)]
pub struct ProfileState {
    /// Loaded user, if any
    pub user: Option<User>,
    /// Policies of the loaded user
    pub policies: Vec<Policy>,
    /// Last error message
    pub error: Option<String>,
    /// Whether a fetch is in flight
    pub loading: bool,
}

impl ProfileState {
    /// Whether any policy of the loaded user grants `action` on `resource`.
    #[must_use]
    pub fn can(&self, action: &str, resource: &str) -> bool {
        self.policies.iter().any(|policy| policy.allows(action, resource))
    }
}

/// Profile actions.
#[derive(Debug, Clone)]
pub enum ProfileAction {
    /// Owned by the authenticated interceptor
    Auth(AuthenticatedAction<ProfileAction>),
    /// A current-user fetch started
    Init,
    /// The profile was loaded
    Success(Profile),
    /// The fetch failed
    Error(String),
}

impl ProfileAction {
    /// Whether this action ends a current-user fetch.
    #[must_use]
    pub const fn is_outcome(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_))
    }
}

impl AuthenticatedActionKind for ProfileAction {
    fn as_authenticated(&self) -> Option<&AuthenticatedAction<Self>> {
        match self {
            Self::Auth(action) => Some(action),
            _ => None,
        }
    }
}

/// Request the current user's profile.
#[must_use]
pub fn fetch_current_user() -> ProfileAction {
    ProfileAction::Auth(authenticated_request(
        AuthenticatedRequest::new(RequestConfig::get(CURRENT_USER_PATH), on_profile, on_error)
            .on_start(|| Some(ProfileAction::Init)),
    ))
}

/// Log the user out.
#[must_use]
pub const fn log_out() -> ProfileAction {
    ProfileAction::Auth(AuthenticatedAction::LogOut)
}

#[allow(clippy::needless_pass_by_value)] // signature required by the callback type
fn on_profile(response: HttpResponse) -> Option<ProfileAction> {
    let action = match response.body.parse_json::<Profile>() {
        Ok(profile) => ProfileAction::Success(profile),
        Err(e) => ProfileAction::Error(format!("invalid profile response: {e}")),
    };
    Some(action)
}

fn on_error(error: RequestError) -> Option<ProfileAction> {
    let message = match &error.response {
        Some(response) => response
            .body
            .parse_json::<ApiError>()
            .map_or(error.message.clone(), |body| body.reason),
        None if error.kind == RequestErrorKind::InvalidRequest => error.message,
        None => "no response received".to_string(),
    };
    Some(ProfileAction::Error(message))
}

/// Profile reducer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileReducer;

impl Reducer for ProfileReducer {
    type State = ProfileState;
    type Action = ProfileAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ProfileAction::Init => {
                *state = ProfileState {
                    loading: true,
                    ..ProfileState::default()
                };
            },
            ProfileAction::Success(profile) => {
                state.loading = false;
                state.user = Some(profile.user);
                state.policies = profile.policies;
            },
            ProfileAction::Error(message) => {
                state.loading = false;
                state.error = Some(message);
            },
            ProfileAction::Auth(AuthenticatedAction::LogOut) => {
                *state = ProfileState::default();
            },
            ProfileAction::Auth(AuthenticatedAction::Request(_)) => {},
        }

        smallvec![Effect::None]
    }
}
