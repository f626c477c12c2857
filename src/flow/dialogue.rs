//! Dialogue definitions — option catalogs, prompt texts, and the proposal
//! summary template.
//!
//! User-facing text is Hebrew; the bot serves Hebrew-speaking WhatsApp users.
//! Cancel keywords accept both Hebrew and English.

use serde::{Deserialize, Serialize};

use super::session::Session;
use super::state::{FlowKind, FlowState};

// ── Replies ─────────────────────────────────────────────────────────────

pub const CANCELLED_REPLY: &str = "התהליך בוטל. תודה!";
pub const UNKNOWN_CHOICE_REPLY: &str = "אני לא מבין את הבחירה שלך";
pub const CHOOSE_OPTION_REPLY: &str = "אנא בחר אחת מהאפשרויות";
pub const PROPOSAL_CHOICE_NUDGE: &str = "אנא בחר אחת מהאפשרויות או הקלד 'סיום' כדי לסיים";
pub const EXISTING_PROPOSAL_REPLY: &str = "מצע קיים - עדיין בפיתוח";
pub const NAME_QUESTION: &str = "מה שם הדיון?";
pub const PARTICIPANTS_QUESTION: &str = "מי המשתתפים בדיון? (הקלד את שמות המשתתפים מופרדים בפסיקים)";
pub const CONTENT_QUESTION: &str = "מה תוכן הדיון?";
/// Rendered in the summary for a field that was never collected.
pub const NOT_SPECIFIED: &str = "לא צוין";

const TOP_LEVEL_BODY: &str = "אנא בחר אחת מהאפשרויות:";
const PROPOSAL_CHOICE_BODY: &str = "מה תרצה לעשות?";
const SELECT_BUTTON_TEXT: &str = "בחר אפשרות";

/// Words that abandon the current flow (matched case-insensitively).
pub const CANCEL_KEYWORDS: [&str; 6] = ["סיים", "סיום", "ביטול", "done", "exit", "cancel"];

/// Whether `text` asks to abandon the current flow.
pub fn is_cancel_keyword(text: &str) -> bool {
    let text = text.trim().to_lowercase();
    CANCEL_KEYWORDS.iter().any(|k| *k == text)
}

// ── Collected field keys ────────────────────────────────────────────────

pub mod fields {
    pub const TYPE: &str = "type";
    pub const NAME: &str = "name";
    pub const PARTICIPANTS: &str = "participants";
    pub const CONTENT: &str = "content";
}

/// Value stored under [`fields::TYPE`] when a flow is entered.
pub fn flow_tag(kind: FlowKind) -> &'static str {
    match kind {
        FlowKind::Proposal => "proposal",
    }
}

// ── Prompts ─────────────────────────────────────────────────────────────

/// How an interactive prompt is rendered by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// Up to three reply buttons.
    Buttons,
    /// A collapsible list opened by `button_text`.
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptOption {
    pub id: String,
    pub title: String,
}

/// A multi-option prompt for the outbound adapter to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSpec {
    pub body_text: String,
    pub options: Vec<PromptOption>,
    pub style: PromptStyle,
    /// Label of the list opener / selection action.
    pub button_text: String,
}

impl PromptSpec {
    fn from_catalog<'a>(
        body_text: &str,
        style: PromptStyle,
        options: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            body_text: body_text.to_string(),
            options: options
                .into_iter()
                .map(|(id, title)| PromptOption {
                    id: id.to_string(),
                    title: title.to_string(),
                })
                .collect(),
            style,
            button_text: SELECT_BUTTON_TEXT.to_string(),
        }
    }
}

// ── Top-level catalog ───────────────────────────────────────────────────

/// Options offered from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevelChoice {
    ProposalForDiscussion,
    NewReminder,
    ControlAndMonitoring,
    NewTask,
}

/// What selecting a top-level option does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevelAction {
    /// Enter a flow at its first state.
    Enter(FlowKind),
    /// Not built yet; reply and stay put.
    Stub(&'static str),
}

impl TopLevelChoice {
    pub const ALL: [TopLevelChoice; 4] = [
        Self::ProposalForDiscussion,
        Self::NewReminder,
        Self::ControlAndMonitoring,
        Self::NewTask,
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::ProposalForDiscussion => "proposal_for_discussion",
            Self::NewReminder => "new_reminder",
            Self::ControlAndMonitoring => "control_and_monitoring",
            Self::NewTask => "new_task",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::ProposalForDiscussion => "מצע לדיון",
            Self::NewReminder => "תזכורת חדשה",
            Self::ControlAndMonitoring => "בקרה ומעקב",
            Self::NewTask => "משימה חדשה",
        }
    }

    pub fn action(&self) -> TopLevelAction {
        match self {
            Self::ProposalForDiscussion => TopLevelAction::Enter(FlowKind::Proposal),
            Self::NewReminder => TopLevelAction::Stub("תזכורת חדשה - עדיין בפיתוח"),
            Self::ControlAndMonitoring => TopLevelAction::Stub("בקרה ומעקב - עדיין בפיתוח"),
            Self::NewTask => TopLevelAction::Stub("משימה חדשה - עדיין בפיתוח"),
        }
    }
}

/// The menu shown from `Idle`.
pub fn top_level_prompt() -> PromptSpec {
    PromptSpec::from_catalog(
        TOP_LEVEL_BODY,
        PromptStyle::List,
        TopLevelChoice::ALL.iter().map(|c| (c.id(), c.title())),
    )
}

// ── Proposal flow ───────────────────────────────────────────────────────

/// New or existing proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalChoice {
    New,
    Existing,
}

impl ProposalChoice {
    pub const ALL: [ProposalChoice; 2] = [Self::New, Self::Existing];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::New => "proposal_new",
            Self::Existing => "proposal_existing",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::New => "מצע חדש",
            Self::Existing => "מצע קיים",
        }
    }
}

pub fn proposal_choice_prompt() -> PromptSpec {
    PromptSpec::from_catalog(
        PROPOSAL_CHOICE_BODY,
        PromptStyle::Buttons,
        ProposalChoice::ALL.iter().map(|c| (c.id(), c.title())),
    )
}

/// The question asked on entering a text-collecting state.
pub fn question_for(state: FlowState) -> Option<&'static str> {
    match state {
        FlowState::ProposalNewName => Some(NAME_QUESTION),
        FlowState::ProposalNewParticipants => Some(PARTICIPANTS_QUESTION),
        FlowState::ProposalNewContent => Some(CONTENT_QUESTION),
        FlowState::Idle | FlowState::ProposalChoice | FlowState::ProposalComplete => None,
    }
}

/// The data-bag key a text-collecting state fills.
pub fn field_for(state: FlowState) -> Option<&'static str> {
    match state {
        FlowState::ProposalNewName => Some(fields::NAME),
        FlowState::ProposalNewParticipants => Some(fields::PARTICIPANTS),
        FlowState::ProposalNewContent => Some(fields::CONTENT),
        FlowState::Idle | FlowState::ProposalChoice | FlowState::ProposalComplete => None,
    }
}

/// Typed view over the answers the proposal flow collects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalDraft {
    pub name: Option<String>,
    pub participants: Option<String>,
    pub content: Option<String>,
}

impl ProposalDraft {
    pub fn from_session(session: &Session) -> Self {
        let get = |key: &str| session.field(key).map(str::to_string);
        Self {
            name: get(fields::NAME),
            participants: get(fields::PARTICIPANTS),
            content: get(fields::CONTENT),
        }
    }

    /// Render the fixed summary message.
    pub fn summary(&self) -> String {
        let or_missing =
            |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_SPECIFIED.to_string());
        [
            "📋 סיכום מצע הדיון:".to_string(),
            String::new(),
            format!("📝 שם הדיון: {}", or_missing(&self.name)),
            format!("👥 משתתפים: {}", or_missing(&self.participants)),
            "📄 תוכן הדיון:".to_string(),
            or_missing(&self.content),
            String::new(),
            "✅ הפרטים נשמרו בהצלחה!".to_string(),
        ]
        .join("\n")
    }
}
