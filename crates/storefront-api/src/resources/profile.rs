//! # Account Endpoints
//!
//! The shopper's own profile, and the admin console's profile and
//! dashboard counters. Every call here needs a bearer token.

use reqwest::multipart::Form;
use serde::Deserialize;
use storefront_core::{DashboardStats, ProfileUpdate, Upload, UserProfile, ValidationError};
use tracing::info;

use crate::client::{file_part, ApiClient};
use crate::error::ApiResult;

/// Body returned after a picture upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PictureResponse {
    #[serde(default)]
    profile_picture: Option<String>,
}

fn check_update(update: &ProfileUpdate) -> Result<(), ValidationError> {
    if update.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    Ok(())
}

fn picture_form(picture: &Upload) -> ApiResult<Form> {
    Ok(Form::new().part("profilePicture", file_part(picture)?))
}

// =============================================================================
// Shopper Profile
// =============================================================================

/// Shopper profile endpoints. Obtain via [`ApiClient::profile`].
#[derive(Debug, Clone, Copy)]
pub struct Profile<'a> {
    client: &'a ApiClient,
}

impl<'a> Profile<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Profile { client }
    }

    /// Profile of the token's owner. A 401 here means the token is dead.
    pub async fn get(&self) -> ApiResult<UserProfile> {
        let request = self.client.get("/api/users/profile")?;
        self.client.send_json(request).await
    }

    pub async fn update(&self, update: &ProfileUpdate) -> ApiResult<()> {
        check_update(update)?;
        let request = self.client.put("/api/users/profile")?.json(update);
        self.client.send_unit(request).await?;
        info!("Profile updated");
        Ok(())
    }

    /// Replaces the profile picture; returns its new asset path if the
    /// server reports one.
    pub async fn upload_picture(&self, picture: &Upload) -> ApiResult<Option<String>> {
        let request = self
            .client
            .put("/api/users/profile/picture")?
            .multipart(picture_form(picture)?);
        let response: PictureResponse = self.client.send_json(request).await?;
        info!(file = %picture.file_name, "Profile picture uploaded");
        Ok(response.profile_picture)
    }
}

// =============================================================================
// Admin Console
// =============================================================================

/// Admin endpoints. Obtain via [`ApiClient::admin`].
#[derive(Debug, Clone, Copy)]
pub struct Admin<'a> {
    client: &'a ApiClient,
}

impl<'a> Admin<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Admin { client }
    }

    pub async fn profile(&self) -> ApiResult<UserProfile> {
        let request = self.client.get("/api/admin/profile")?;
        self.client.send_json(request).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<()> {
        check_update(update)?;
        let request = self.client.put("/api/admin/profile")?.json(update);
        self.client.send_unit(request).await?;
        info!("Admin profile updated");
        Ok(())
    }

    pub async fn upload_picture(&self, picture: &Upload) -> ApiResult<Option<String>> {
        let request = self
            .client
            .post("/api/admin/profile/upload")?
            .multipart(picture_form(picture)?);
        let response: PictureResponse = self.client.send_json(request).await?;
        info!(file = %picture.file_name, "Admin picture uploaded");
        Ok(response.profile_picture)
    }

    /// User, product and review counters for the dashboard.
    pub async fn dashboard(&self) -> ApiResult<DashboardStats> {
        let request = self.client.get("/api/admin/dashboard")?;
        self.client.send_json(request).await
    }
}
