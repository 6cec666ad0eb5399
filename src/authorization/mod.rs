//! Authorization decision orchestration
//!
//! An authorization request crosses two HTTP round trips: the initial
//! request, which may show the authorization page, and the decision posted
//! back from that page. This module holds the logic that joins them:
//!
//! - [`dispatcher`] -- routes the initial request on the engine's verdict
//! - [`freshness`] -- invalidates cached authentication on `prompt=login`
//!   or an exceeded `max_age`
//! - [`no_interaction`] -- answers `prompt=none` requests from the session
//! - [`decision`] -- authenticates the user and resumes the pending request
//! - [`context`] and [`disposition`] -- the data passed between them

pub mod context;
pub mod decision;
pub mod dispatcher;
pub mod disposition;
pub mod freshness;
pub mod no_interaction;

pub use context::{AuthorizationContext, ClientInfo, Prompt, Scope};
pub use decision::{Decision, DecisionCollector, DecisionForm, DecisionOutcome};
pub use dispatcher::{AuthorizationDispatcher, DispatchOutcome, InteractionPage};
pub use disposition::{Disposition, FailReason, Issuance};
pub use no_interaction::NoInteractionVerdict;
