//! Per-language message templates with `{issueId}` and `{status}`
//! placeholders. Languages without a translation fall back to Hindi.

use std::collections::HashMap;

use civicsignal_common::Language;

use crate::notification::{NotificationJob, NotificationKind};
use crate::notify::provider::RenderedMessage;

#[derive(Debug, Clone)]
struct LanguagePack {
    update: &'static str,
    resolved: &'static str,
    feedback: &'static str,
    urgent: &'static str,
    system: &'static str,
}

const HINDI: LanguagePack = LanguagePack {
    update: "आपकी रिपोर्ट #{issueId} को अपडेट मिला है। स्थिति: {status}",
    resolved: "बधाई हो! आपकी रिपोर्ट #{issueId} का समाधान हो गया है।",
    feedback: "कृपया रिपोर्ट #{issueId} पर अपनी राय दें।",
    urgent: "आपके क्षेत्र में तत्काल ध्यान की जरूरत है।",
    system: "ऐप में नए अपडेट उपलब्ध हैं।",
};

const ENGLISH: LanguagePack = LanguagePack {
    update: "Your report #{issueId} has been updated. Status: {status}",
    resolved: "Congratulations! Your report #{issueId} has been resolved.",
    feedback: "Please provide feedback on report #{issueId}.",
    urgent: "Urgent attention needed in your area.",
    system: "New updates available in the app.",
};

const PUNJABI: LanguagePack = LanguagePack {
    update: "ਤੁਹਾਡੀ ਰਿਪੋਰਟ #{issueId} ਨੂੰ ਅਪਡੇਟ ਮਿਲਿਆ ਹੈ।",
    resolved: "ਵਧਾਈ! ਤੁਹਾਡੀ ਰਿਪੋਰਟ #{issueId} ਦਾ ਹੱਲ ਹੋ ਗਿਆ ਹੈ।",
    feedback: "ਕਿਰਪਾ ਕਰਕੇ ਰਿਪੋਰਟ #{issueId} ਬਾਰੇ ਆਪਣੀ ਰਾਏ ਦਿਓ।",
    urgent: "ਤੁਹਾਡੇ ਖੇਤਰ ਵਿੱਚ ਤੁਰੰਤ ਧਿਆਨ ਦੀ ਲੋੜ ਹੈ।",
    system: "ਐਪ ਵਿੱਚ ਨਵੇ ਅਪਡੇਟ ਉਪਲਬਧ ਹਨ।",
};

#[derive(Clone)]
pub struct TemplateRegistry {
    packs: HashMap<Language, LanguagePack>,
    fallback: Language,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::with_fallback(Language::Hindi)
    }

    /// A registry whose untranslated languages render in `fallback` instead
    /// of Hindi. Languages without a pack at all still end up on Hindi.
    pub fn with_fallback(fallback: Language) -> Self {
        let mut packs = HashMap::new();
        packs.insert(Language::Hindi, HINDI);
        packs.insert(Language::English, ENGLISH);
        packs.insert(Language::Punjabi, PUNJABI);
        Self { packs, fallback }
    }

    fn pack(&self, language: Language) -> &LanguagePack {
        self.packs
            .get(&language)
            .or_else(|| self.packs.get(&self.fallback))
            .unwrap_or(&HINDI)
    }

    /// Render the outgoing message for one job. Templated kinds get the
    /// language pack body; everything else keeps the job's stored text.
    pub fn render(&self, job: &NotificationJob) -> RenderedMessage {
        let pack = self.pack(job.language);
        let template = match job.kind {
            NotificationKind::IssueUpdate => Some(pack.update),
            NotificationKind::IssueResolved => Some(pack.resolved),
            NotificationKind::FeedbackRequest => Some(pack.feedback),
            NotificationKind::UrgentAlert => Some(pack.urgent),
            NotificationKind::SystemAlert => Some(pack.system),
            NotificationKind::CommentReply | NotificationKind::Assignment => None,
        };

        let body = match template {
            Some(template) => {
                let issue_id = job
                    .payload
                    .as_ref()
                    .and_then(|p| p.issue_id)
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                let status = job
                    .payload
                    .as_ref()
                    .and_then(|p| p.issue_status)
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                template.replace("{issueId}", &issue_id).replace("{status}", &status)
            }
            None => job.body.clone(),
        };

        RenderedMessage { title: job.title.clone(), body }
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
