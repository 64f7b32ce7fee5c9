use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::QueryRejection;
use serde_json::json;

use crate::memberships::repo::MembershipKind;

/// Rejected recipe input. Variants are listed in the order the composer checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationKind {
    #[error("recipe name is empty")]
    EmptyName,
    #[error("recipe name is longer than 200 characters")]
    NameTooLong,
    #[error("you already have a recipe with this name")]
    DuplicateName,
    #[error("recipe text is empty")]
    EmptyText,
    #[error("cooking time must be at least one minute")]
    InvalidCookingTime,
    #[error("recipe has no ingredients")]
    EmptyIngredients,
    #[error("ingredient amount must be at least 1")]
    InvalidAmount,
    #[error("ingredient is listed more than once")]
    DuplicateIngredient,
    #[error("recipe has no tags")]
    EmptyTags,
    #[error("tag is listed more than once")]
    DuplicateTag,
    #[error("recipe image is missing")]
    MissingImage,
    #[error("recipe image is not a valid base64 data URI")]
    BadImageEncoding,
}

impl ValidationKind {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationKind::EmptyName => "EMPTY_NAME",
            ValidationKind::NameTooLong => "NAME_TOO_LONG",
            ValidationKind::DuplicateName => "DUPLICATE_NAME",
            ValidationKind::EmptyText => "EMPTY_TEXT",
            ValidationKind::InvalidCookingTime => "INVALID_COOKING_TIME",
            ValidationKind::EmptyIngredients => "EMPTY_INGREDIENTS",
            ValidationKind::InvalidAmount => "INVALID_AMOUNT",
            ValidationKind::DuplicateIngredient => "DUPLICATE_INGREDIENT",
            ValidationKind::EmptyTags => "EMPTY_TAGS",
            ValidationKind::DuplicateTag => "DUPLICATE_TAG",
            ValidationKind::MissingImage => "MISSING_IMAGE",
            ValidationKind::BadImageEncoding => "BAD_IMAGE_ENCODING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Ingredient,
    Tag,
    Recipe,
    User,
    Membership,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Ingredient => "ingredient",
            Entity::Tag => "tag",
            Entity::Recipe => "recipe",
            Entity::User => "user",
            Entity::Membership => "membership",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConflictKind {
    #[error("recipe is already in the {0}")]
    AlreadyMember(MembershipKind),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(ValidationKind),

    #[error("{entity} not found")]
    NotFound { entity: Entity, id: Option<String> },

    #[error("conflict: {0}")]
    Conflict(ConflictKind),

    /// The body or query string could not be read into the expected shape.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("permission denied")]
    Permission,

    #[error("authentication required: {0}")]
    Unauthenticated(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        AppError::NotFound {
            entity,
            id: Some(id.to_string()),
        }
    }
}

impl From<ValidationKind> for AppError {
    fn from(kind: ValidationKind) -> Self {
        AppError::Validation(kind)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(kind) => (StatusCode::BAD_REQUEST, kind.code(), kind.to_string()),
            AppError::NotFound { entity, id } => {
                let message = match id {
                    Some(id) => format!("{entity} {id} not found"),
                    None => format!("{entity} not found"),
                };
                (StatusCode::NOT_FOUND, "NOT_FOUND", message)
            }
            AppError::Conflict(kind) => (StatusCode::BAD_REQUEST, "CONFLICT", kind.to_string()),
            AppError::MalformedRequest(detail) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_REQUEST", detail.clone())
            }
            AppError::Permission => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "you are not allowed to modify this recipe".to_string(),
            ),
            AppError::Unauthenticated(reason) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", reason.to_string())
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "an internal error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::MalformedRequest(rejection.to_string())
    }
}

/// Storage failures that slipped past the eager checks (mostly races) are
/// mapped back onto the domain taxonomy by constraint name.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(kind) = db_err.constraint().and_then(classify_constraint) {
                return kind;
            }
            if let Some(kind) = db_err.code().as_deref().and_then(classify_sqlstate) {
                return kind;
            }
        }
        AppError::Internal(anyhow::Error::new(err).context("database query"))
    }
}

/// `recipes.name` is the only length-limited column fed from user input.
fn classify_sqlstate(code: &str) -> Option<AppError> {
    match code {
        "22001" => Some(ValidationKind::NameTooLong.into()),
        _ => None,
    }
}

fn classify_constraint(constraint: &str) -> Option<AppError> {
    let err = match constraint {
        "uq_cart_entries_user_recipe" => {
            AppError::Conflict(ConflictKind::AlreadyMember(MembershipKind::Cart))
        }
        "uq_favorite_entries_user_recipe" => {
            AppError::Conflict(ConflictKind::AlreadyMember(MembershipKind::Favorite))
        }
        "uq_recipes_author_name" => ValidationKind::DuplicateName.into(),
        "uq_recipe_ingredients_recipe_ingredient" => ValidationKind::DuplicateIngredient.into(),
        "uq_recipe_tags_recipe_tag" => ValidationKind::DuplicateTag.into(),
        "fk_recipe_ingredients_ingredient" => AppError::NotFound {
            entity: Entity::Ingredient,
            id: None,
        },
        "fk_recipe_tags_tag" => AppError::NotFound {
            entity: Entity::Tag,
            id: None,
        },
        "fk_cart_entries_recipe" | "fk_favorite_entries_recipe" | "fk_recipe_ingredients_recipe"
        | "fk_recipe_tags_recipe" => AppError::NotFound {
            entity: Entity::Recipe,
            id: None,
        },
        "fk_recipes_author" | "fk_cart_entries_user" | "fk_favorite_entries_user" => {
            AppError::NotFound {
                entity: Entity::User,
                id: None,
            }
        }
        _ => return None,
    };
    Some(err)
}
