use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Donor {
    pub donor_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Recipient {
    pub recipient_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub family_size: i64,
    pub urgency: Urgency,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Ngo {
    pub ngo_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Donation {
    pub donation_id: i64,
    pub donor_id: i64,
    pub ngo_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub quantity: i64,
    pub status: DonationStatus,
    pub image_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Request {
    pub request_id: i64,
    pub recipient_id: i64,
    pub ngo_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub urgency: Urgency,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Match {
    pub match_id: i64,
    pub donation_id: i64,
    pub request_id: Option<i64>,
    pub ngo_id: i64,
    pub status: MatchStatus,
    pub matched_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Feedback {
    pub feedback_id: i64,
    pub user_id: i64,
    pub donation_id: Option<i64>,
    pub rating: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Donation lifecycle: pending -> accepted -> delivered, or pending -> cancelled.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Accepted,
    Delivered,
    Cancelled,
}

impl DonationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Accepted => "accepted",
            DonationStatus::Delivered => "delivered",
            DonationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DonationStatus::Pending),
            "accepted" => Some(DonationStatus::Accepted),
            "delivered" => Some(DonationStatus::Delivered),
            "cancelled" => Some(DonationStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request lifecycle: pending -> accepted -> fulfilled, or pending -> cancelled.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Fulfilled,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Fulfilled => "fulfilled",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "fulfilled" => Some(RequestStatus::Fulfilled),
            "cancelled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match lifecycle: matched -> delivered, or matched -> cancelled.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Matched,
    Delivered,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Matched => "matched",
            MatchStatus::Delivered => "delivered",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "matched" => Some(MatchStatus::Matched),
            "delivered" => Some(MatchStatus::Delivered),
            "cancelled" => Some(MatchStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Urgency::Low),
            "medium" => Some(Urgency::Medium),
            "high" => Some(Urgency::High),
            "critical" => Some(Urgency::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_round_trips() {
        for s in [
            DonationStatus::Pending,
            DonationStatus::Accepted,
            DonationStatus::Delivered,
            DonationStatus::Cancelled,
        ] {
            assert_eq!(DonationStatus::parse(s.as_str()), Some(s));
        }
        for s in [
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::Fulfilled,
            RequestStatus::Cancelled,
        ] {
            assert_eq!(RequestStatus::parse(s.as_str()), Some(s));
        }
        for s in [MatchStatus::Matched, MatchStatus::Delivered, MatchStatus::Cancelled] {
            assert_eq!(MatchStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(DonationStatus::parse("matched"), None);
        assert_eq!(Urgency::parse("urgent"), None);
    }
}
