use crate::storage::Entity;

use super::operations::{validate_user_create, validate_user_update};
use super::types::{User, UserCreate, UserResponse, UserUpdate};

impl Entity for User {
    type Record = User;
    type Create = UserCreate;
    type Update = UserUpdate;
    type View = UserResponse;

    const NAME: &'static str = "User";
    const KEY_FIELDS: &'static [&'static str] = &["id", "email", "name", "is_active"];

    fn to_view(record: &User) -> UserResponse {
        UserResponse::from(record)
    }

    fn key_field(view: &UserResponse, field: &str) -> Option<String> {
        match field {
            "id" => Some(view.id.to_string()),
            "email" => Some(view.email.clone()),
            "name" => Some(view.name.clone()),
            "is_active" => Some(view.is_active.to_string()),
            _ => None,
        }
    }

    fn validate_create(input: &UserCreate) -> Result<(), String> {
        validate_user_create(input).map_err(|e| e.to_string())
    }

    fn validate_update(input: &UserUpdate) -> Result<(), String> {
        validate_user_update(input).map_err(|e| e.to_string())
    }
}
