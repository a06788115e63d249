use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::text_column;
use crate::core::pagination::{Cursor, Keyed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Member,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "MEMBER",
            Role::Admin => "ADMIN",
            Role::Owner => "OWNER",
        }
    }

    pub fn can_manage(&self) -> bool {
        *self >= Role::Admin
    }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MEMBER" => Ok(Role::Member),
            "ADMIN" => Ok(Role::Admin),
            "OWNER" => Ok(Role::Owner),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

text_column!(Role);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "FREE",
            Plan::Pro => "PRO",
        }
    }

    /// Members plus pending invitations an organization may hold.
    pub fn member_limit(&self) -> Option<i64> {
        match self {
            Plan::Free => Some(5),
            Plan::Pro => None,
        }
    }
}

impl FromStr for Plan {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(Plan::Free),
            "PRO" => Ok(Plan::Pro),
            _ => Err(format!("unknown plan: {}", s)),
        }
    }
}

text_column!(Plan);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Organization {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub plan: Plan,
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,
    #[serde(skip_serializing)]
    pub stripe_subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An organization as seen by one of its members.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Membership {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub plan: Plan,
    pub role: Role,
    pub member_count: i64,
    pub joined_at: DateTime<Utc>,
}

impl Keyed for Membership {
    fn cursor(&self) -> Cursor {
        Cursor::new(self.joined_at, self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Member {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

impl Keyed for Member {
    fn cursor(&self) -> Cursor {
        Cursor::new(self.joined_at, self.user_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Insert {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub name: String,
}

/// Billing fields to overwrite; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct BillingUpdate {
    pub plan: Option<Plan>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Billing {
    pub plan: Plan,
    pub subscription_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub has_customer: bool,
}

impl From<&Organization> for Billing {
    fn from(o: &Organization) -> Self {
        Self {
            plan: o.plan,
            subscription_status: o.subscription_status.clone(),
            current_period_end: o.current_period_end,
            has_customer: o.stripe_customer_id.is_some(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_role_order() {
        assert!(Role::Owner > Role::Admin);
        assert!(Role::Admin.can_manage());
        assert!(!Role::Member.can_manage());
        assert_eq!("OWNER".parse::<Role>().unwrap(), Role::Owner);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_json() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(serde_json::from_str::<Role>("\"MEMBER\"").unwrap(), Role::Member);
    }

    #[test]
    fn test_plan_limits() {
        assert_eq!(Plan::Free.member_limit(), Some(5));
        assert_eq!(Plan::Pro.member_limit(), None);
    }
}
