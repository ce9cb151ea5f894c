//! Optional features and the gate that decides who sees them.
//!
//! A feature requires either a registered user or a user on the premium
//! tier. [evaluate_gate] makes the decision and [feature_gate] renders it.

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    AppState,
    auth::Session,
    db::StorageMode,
    endpoints,
    html::{CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE},
    layout::layout,
    user::SubscriptionTier,
};

/// Who may use a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// Any logged in user.
    Registered,
    /// Logged in users on the premium tier.
    Premium,
}

impl AccessLevel {
    fn label(self) -> &'static str {
        match self {
            AccessLevel::Registered => "Registered",
            AccessLevel::Premium => "Premium",
        }
    }
}

/// An optional part of the app that is hidden from users without access.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub required_level: AccessLevel,
    /// Disabled features are hidden from everyone.
    pub enabled: bool,
}

/// The spending by category chart on the dashboard.
pub const SPENDING_INSIGHTS: Feature = Feature {
    id: "spending-insights",
    name: "Spending insights",
    description: "A chart of this month's spending by category on the dashboard.",
    required_level: AccessLevel::Registered,
    enabled: true,
};

/// Recomputing an account balance from its transactions.
pub const BALANCE_RECONCILIATION: Feature = Feature {
    id: "balance-reconciliation",
    name: "Balance reconciliation",
    description: "Recompute an account's balance from its transactions and fix any drift.",
    required_level: AccessLevel::Premium,
    enabled: true,
};

/// Every optional feature.
pub const FEATURES: [Feature; 2] = [SPENDING_INSIGHTS, BALANCE_RECONCILIATION];

/// What a gate shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The gated content.
    Children,
    /// The content to show users without access.
    Fallback,
    Nothing,
}

/// Decide what a gate requiring `required_level` shows for `session`.
///
/// Users without access see the fallback if `has_fallback`, otherwise nothing.
pub fn evaluate_gate(
    required_level: AccessLevel,
    session: &Session,
    has_fallback: bool,
) -> GateOutcome {
    let has_access = match (required_level, session.user()) {
        (_, None) => false,
        (AccessLevel::Registered, Some(_)) => true,
        (AccessLevel::Premium, Some(user)) => user.tier == SubscriptionTier::Premium,
    };

    match (has_access, has_fallback) {
        (true, _) => GateOutcome::Children,
        (false, true) => GateOutcome::Fallback,
        (false, false) => GateOutcome::Nothing,
    }
}

/// Whether `session` may use `feature`.
pub fn is_unlocked(feature: &Feature, session: &Session) -> bool {
    feature.enabled && evaluate_gate(feature.required_level, session, false) == GateOutcome::Children
}

/// Render `children` if `session` may use `feature`, otherwise `fallback`.
///
/// Disabled features render nothing.
pub fn feature_gate(
    feature: &Feature,
    session: &Session,
    children: Markup,
    fallback: Option<Markup>,
) -> Markup {
    if !feature.enabled {
        return html!();
    }

    match (
        evaluate_gate(feature.required_level, session, fallback.is_some()),
        fallback,
    ) {
        (GateOutcome::Children, _) => children,
        (GateOutcome::Fallback, Some(fallback)) => fallback,
        _ => html!(),
    }
}

/// The state needed for the features page.
#[derive(Debug, Clone)]
pub struct FeaturesPageState {
    pub storage_mode: StorageMode,
}

impl FromRef<AppState> for FeaturesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            storage_mode: state.storage_mode.clone(),
        }
    }
}

fn locked_message(feature: &Feature, session: &Session) -> Markup {
    html! {
        @if session.is_authenticated() {
            p class="text-sm text-gray-500 dark:text-gray-400"
            {
                "Locked. Requires the " (feature.required_level.label()) " tier."
            }
        } @else {
            p class="text-sm text-gray-500 dark:text-gray-400"
            {
                "Locked. "
                a href=(endpoints::LOG_IN_VIEW) class=(LINK_STYLE) { "Log in" }
                " to use this feature."
            }
        }
    }
}

fn features_view(session: &Session) -> Markup {
    html! {
        div class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-xl space-y-4"
            {
                h1 class="text-xl font-bold" { "Features" }

                ul class="space-y-4"
                {
                    @for feature in &FEATURES {
                        li class=(CARD_STYLE) data-feature-id=(feature.id)
                        {
                            div class="flex items-start justify-between gap-3"
                            {
                                h2 class="font-semibold" { (feature.name) }
                                span class="text-xs uppercase text-gray-500 dark:text-gray-400"
                                {
                                    (feature.required_level.label())
                                }
                            }

                            p class="mt-1 text-sm" { (feature.description) }

                            (feature_gate(
                                feature,
                                session,
                                html! {
                                    p class="text-sm text-green-700 dark:text-green-400"
                                        data-gate="unlocked"
                                    {
                                        "Unlocked"
                                    }
                                },
                                Some(locked_message(feature, session)),
                            ))
                        }
                    }
                }
            }
        }
    }
}

/// Renders the list of features and whether the current user can use them.
///
/// Reachable without logging in.
pub async fn get_features_page(
    State(state): State<FeaturesPageState>,
    session: Session,
) -> Response {
    layout(
        "Features",
        endpoints::FEATURES_VIEW,
        &state.storage_mode,
        &[],
        &features_view(&session),
    )
    .into_response()
}

#[cfg(test)]
mod evaluate_gate_tests {
    use crate::{
        auth::{AuthUser, Session},
        user::{SubscriptionTier, UserID},
    };

    use super::{AccessLevel, GateOutcome, evaluate_gate};

    fn session_with(tier: Option<SubscriptionTier>) -> Session {
        let mut session = Session::start();
        session.resolve(tier.map(|tier| AuthUser {
            id: UserID::new(1),
            tier,
        }));
        session
    }

    #[test]
    fn decision_table() {
        let cases = [
            (AccessLevel::Registered, None, true, GateOutcome::Fallback),
            (AccessLevel::Registered, None, false, GateOutcome::Nothing),
            (
                AccessLevel::Registered,
                Some(SubscriptionTier::Free),
                true,
                GateOutcome::Children,
            ),
            (AccessLevel::Premium, None, true, GateOutcome::Fallback),
            (AccessLevel::Premium, None, false, GateOutcome::Nothing),
            (
                AccessLevel::Premium,
                Some(SubscriptionTier::Premium),
                false,
                GateOutcome::Children,
            ),
            (
                AccessLevel::Premium,
                Some(SubscriptionTier::Free),
                true,
                GateOutcome::Fallback,
            ),
            (
                AccessLevel::Premium,
                Some(SubscriptionTier::Free),
                false,
                GateOutcome::Nothing,
            ),
        ];

        for (level, tier, has_fallback, want) in cases {
            let got = evaluate_gate(level, &session_with(tier), has_fallback);
            assert_eq!(
                got, want,
                "{level:?} with tier {tier:?} and fallback {has_fallback}"
            );
        }
    }

    #[test]
    fn loading_session_is_not_authenticated() {
        let got = evaluate_gate(AccessLevel::Registered, &Session::start(), true);

        assert_eq!(got, GateOutcome::Fallback);
    }
}
