//! Typed, validated submission forms.
//!
//! Each page-specific form is an explicit struct with its validators
//! declared on the fields. Validation happens before any remote call.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use brokerdesk_core::error::{AppError, ErrorKind};
use brokerdesk_core::result::AppResult;

use crate::business::{Business, Industry, ListingStatus};
use crate::lead::{Lead, LeadStatus};

/// Validate a form, mapping failures to a validation error.
pub fn validate_form<F: Validate>(form: &F) -> AppResult<()> {
    form.validate().map_err(|e| {
        AppError::with_source(ErrorKind::Validation, format!("Invalid input: {e}"), e)
    })
}

/// Reject values that are empty once trimmed.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Must not be blank".into()));
    }
    Ok(())
}

/// New lead captured by an agent or a contact page.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LeadForm {
    /// Contact name.
    #[validate(
        length(min = 1, max = 200, message = "Name is required"),
        custom(function = "not_blank")
    )]
    pub name: String,
    /// Contact email.
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    /// Contact phone.
    #[validate(length(min = 7, max = 32, message = "Invalid phone number"))]
    pub phone: Option<String>,
    /// Company.
    pub company: Option<String>,
    /// Lead source.
    pub source: Option<String>,
    /// Estimated deal value.
    #[validate(range(min = 0.0, message = "Estimated value cannot be negative"))]
    pub estimated_value: f64,
    /// Notes.
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

impl LeadForm {
    /// Build a new lead owned by `user_id`.
    pub fn into_lead(self, user_id: &str) -> Lead {
        Lead {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: self.name.trim().to_string(),
            email: self.email,
            phone: self.phone,
            company: self.company,
            source: self.source,
            status: LeadStatus::New,
            estimated_value: self.estimated_value,
            notes: self.notes,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Buyer inquiry about a listed business.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InquiryForm {
    /// The listing being asked about.
    #[validate(
        length(min = 1, message = "Listing is required"),
        custom(function = "not_blank")
    )]
    pub business_id: String,
    /// Buyer name.
    #[validate(
        length(min = 1, max = 200, message = "Name is required"),
        custom(function = "not_blank")
    )]
    pub name: String,
    /// Buyer email.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Buyer phone.
    #[validate(length(min = 7, max = 32, message = "Invalid phone number"))]
    pub phone: Option<String>,
    /// Inquiry text.
    #[validate(length(min = 10, max = 5000, message = "Message must be 10-5000 characters"))]
    pub message: String,
}

/// Seller submission of a business listing.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BusinessListingForm {
    /// Business name.
    #[validate(
        length(min = 1, max = 200, message = "Name is required"),
        custom(function = "not_blank")
    )]
    pub name: String,
    /// Description.
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    /// Industry.
    pub industry: Industry,
    /// Asking price.
    #[validate(range(min = 0.0, message = "Asking price cannot be negative"))]
    pub asking_price: f64,
    /// Annual revenue.
    #[validate(range(min = 0.0, message = "Revenue cannot be negative"))]
    pub annual_revenue: Option<f64>,
    /// Location.
    pub location: Option<String>,
}

impl BusinessListingForm {
    /// Build a new active listing owned by `seller_id`.
    pub fn into_business(self, seller_id: &str) -> Business {
        Business {
            id: Uuid::new_v4().to_string(),
            seller_id: seller_id.to_string(),
            name: self.name.trim().to_string(),
            description: self.description,
            industry: self.industry,
            status: ListingStatus::Active,
            asking_price: self.asking_price,
            annual_revenue: self.annual_revenue,
            location: self.location,
            created_at: Utc::now(),
        }
    }
}
