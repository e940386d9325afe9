//! Built-in message sets for the overlay, notices and unload prompt.

#[cfg(test)]
#[path = "locale_test.rs"]
mod locale_test;

use serde::Deserialize;

/// Selects one of the built-in message sets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ko,
    Ja,
}

/// Static strings for one locale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Messages {
    /// Overlay heading while waiting.
    pub title: &'static str,
    /// Overlay body under the heading.
    pub subtitle: &'static str,
    /// Label preceding the numeric position.
    pub position_label: &'static str,
    /// One-time notice for an invalid queue/session key.
    pub empty_notice: &'static str,
    /// One-time notice before the reload on expiry.
    pub expired_notice: &'static str,
    /// Text handed to the browser's leave-confirmation prompt.
    pub leave_prompt: &'static str,
}

const EN: Messages = Messages {
    title: "You are in the queue",
    subtitle: "Please keep this page open. You will be let in automatically.",
    position_label: "Queue position",
    empty_notice: "This queue is not available.",
    expired_notice: "Your waiting time has expired. The page will reload.",
    leave_prompt: "Leaving this page will drop your place in the queue.",
};

const KO: Messages = Messages {
    title: "대기열에 있습니다",
    subtitle: "페이지를 닫지 마세요. 순서가 되면 자동으로 입장합니다.",
    position_label: "대기 순번",
    empty_notice: "사용할 수 없는 대기열입니다.",
    expired_notice: "대기 시간이 만료되었습니다. 페이지를 새로고침합니다.",
    leave_prompt: "페이지를 떠나면 대기 순번이 사라집니다.",
};

const JA: Messages = Messages {
    title: "順番待ちをしています",
    subtitle: "このページを開いたままお待ちください。順番が来ると自動的に入場します。",
    position_label: "待ち順位",
    empty_notice: "この待ち行列は利用できません。",
    expired_notice: "待ち時間が終了しました。ページを再読み込みします。",
    leave_prompt: "このページを離れると順番が失われます。",
};

impl Locale {
    /// Message set for this locale.
    #[must_use]
    pub fn messages(self) -> &'static Messages {
        match self {
            Self::En => &EN,
            Self::Ko => &KO,
            Self::Ja => &JA,
        }
    }
}

/// Default overlay markup for a WAITING client at `position`.
#[must_use]
pub fn default_popup_html(locale: Locale, position: u64) -> String {
    let m = locale.messages();
    format!(
        "<div class=\"waitroom-popup\"><h2>{}</h2><p>{}</p><p class=\"waitroom-position\">{}: {position}</p></div>",
        m.title, m.subtitle, m.position_label
    )
}
