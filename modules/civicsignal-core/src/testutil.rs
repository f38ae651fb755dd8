//! Shared fixtures for unit and integration tests.

use uuid::Uuid;

use civicsignal_common::{Category, GeoPoint, Language, Priority};

use crate::issue::{IssueLocation, NewIssue};
use crate::notification::{Channel, NotificationDraft, NotificationKind};

pub fn test_location() -> IssueLocation {
    IssueLocation {
        point: GeoPoint { lon: 77.1734, lat: 31.1048 },
        address: "Mall Road, The Ridge".to_string(),
        locality: Some("The Ridge".to_string()),
        district: Some("Shimla".to_string()),
        state: Some("Himachal Pradesh".to_string()),
        pincode: Some("171001".to_string()),
    }
}

pub fn test_new_issue() -> NewIssue {
    NewIssue {
        title: "Broken water pipe".to_string(),
        description: "Water pipe burst near the ridge".to_string(),
        category: Some(Category::Water),
        subcategory: None,
        priority: Some(Priority::Medium),
        language: None,
        location: test_location(),
        media: vec![],
        tags: vec!["water".to_string()],
        is_public: true,
    }
}

pub fn new_issue_at(lon: f64, lat: f64, title: &str) -> NewIssue {
    let mut input = test_new_issue();
    input.title = title.to_string();
    input.location.point = GeoPoint { lon, lat };
    input
}

pub fn test_draft(recipient: Uuid) -> NotificationDraft {
    NotificationDraft {
        recipient,
        sender: None,
        kind: NotificationKind::IssueUpdate,
        title: "Issue update".to_string(),
        body: "Your issue status changed".to_string(),
        payload: None,
        channels: vec![Channel::Push, Channel::InApp],
        priority: Priority::Medium,
        language: Language::Hindi,
        scheduled_for: None,
    }
}
