use std::{borrow::Cow, collections::HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::{api::schemas::RecipeRequest, Error, HtmlError};

/// Key under which struct level failures are reported.
const STRUCT_ERRORS: &str = "__all__";

pub static USERNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern compiles"));

fn failure(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    match value.trim().is_empty() {
        true => Err(failure("blank", "this field may not be blank")),
        false => Ok(()),
    }
}

/// Length is checked by the `length` rule next to this one.
pub fn password_strength(password: &str) -> Result<(), ValidationError> {
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(failure("password_letter", "must contain a letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(failure("password_digit", "must contain a digit"));
    }
    Ok(())
}

pub fn unique_ingredients(recipe: &RecipeRequest) -> Result<(), ValidationError> {
    let unique: HashSet<_> = recipe.ingredients.iter().map(|i| i.id).collect();
    match unique.len() == recipe.ingredients.len() {
        true => Ok(()),
        false => Err(failure(
            "duplicate_ingredient",
            "ingredients: each ingredient may appear only once",
        )),
    }
}

fn describe(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => error.code.to_string(),
    }
}

/// Flattens nested errors into `path: message` lines, e.g.
/// `ingredients[0].amount: must be at least 1`.
fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = format!("{prefix}{field}");
        match kind {
            ValidationErrorsKind::Field(list) if *field == STRUCT_ERRORS => {
                out.extend(list.iter().map(describe))
            }
            ValidationErrorsKind::Field(list) => {
                out.extend(list.iter().map(|e| format!("{path}: {}", describe(e))))
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &format!("{path}."), out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, &format!("{path}[{index}]."), out);
                }
            }
        }
    }
}

/// One sorted `field: message` line per failed rule.
pub fn problems(errors: ValidationErrors) -> Vec<String> {
    let mut lines = Vec::new();
    collect(&errors, "", &mut lines);
    lines.sort();
    lines
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        HtmlError::InvalidRequest.fields(problems(errors))
    }
}

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::*;
    use crate::{
        api::schemas::{RegisterRequest, SetPasswordRequest},
        schema::{IngredientAmount, NewIngredient, NewTag},
        ErrorBody,
    };

    #[test]
    fn validation_errors_become_field_problems() {
        let err = Error::from(recipe_without_tags().validate().unwrap_err());
        assert_eq!(err.code, 400);
        assert_eq!(
            err.body,
            ErrorBody::Fields(vec!["tags: at least one tag is required".into()])
        );
    }

    fn recipe_without_tags() -> RecipeRequest {
        let mut recipe = recipe();
        recipe.tags.clear();
        recipe
    }

    fn registration(email: &str, username: &str, first_name: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            username: username.into(),
            first_name: first_name.into(),
            last_name: "Last".into(),
            password: password.into(),
        }
    }

    fn recipe() -> RecipeRequest {
        RecipeRequest {
            ingredients: vec![IngredientAmount { id: 1, amount: 2 }],
            tags: vec![1],
            image: None,
            name: "Soup".into(),
            text: "Boil water".into(),
            cooking_time: 15,
        }
    }

    #[test]
    fn usernames_follow_the_allowed_alphabet() {
        let ok = |name: &str| registration("cook@example.com", name, "Anna", "abcdefg1").validate().is_ok();
        assert!(ok("chef.anna+1@home-k_"));
        assert!(ok("шеф"));
        assert!(!ok("bad name"));
        assert!(!ok("semi;colon"));
        assert!(!ok(&"a".repeat(151)));
    }

    #[test]
    fn passwords_need_length_letter_and_digit() {
        assert!(password_strength("abcdefg1").is_ok());
        assert!(password_strength("12345678").is_err());
        assert!(password_strength("abcdefgh").is_err());

        let change = |new: &str| SetPasswordRequest {
            new_password: new.into(),
            current_password: "whatever".into(),
        };
        assert!(change("abcdefg1").validate().is_ok());
        assert!(change("abc1").validate().is_err());
        assert!(change(&format!("a1{}", "x".repeat(127))).validate().is_err());
    }

    #[test]
    fn registration_reports_every_bad_field() {
        let err = registration("nope", "ok_name", " ", "short").validate().unwrap_err();
        let problems = problems(err);

        assert_eq!(problems.len(), 4, "{problems:?}");
        assert!(problems.iter().any(|p| p.starts_with("email: ")));
        assert!(problems.contains(&"first_name: this field may not be blank".to_string()));
        assert!(problems.contains(&"password: must contain a digit".to_string()));
    }

    #[test]
    fn tag_and_ingredient_limits() {
        let tag = |name: &str, slug: &str| NewTag { name: name.into(), slug: slug.into() };
        assert!(tag("Завтрак", "breakfast").validate().is_ok());
        assert!(tag(&"x".repeat(33), "x").validate().is_err());
        assert!(tag("Lunch", "").validate().is_err());

        let salt = NewIngredient { name: "соль".into(), measurement_unit: "г".into() };
        assert!(salt.validate().is_ok());
        let unitless = NewIngredient { name: "соль".into(), measurement_unit: " ".into() };
        assert!(unitless.validate().is_err());
    }

    #[test]
    fn recipe_rules() {
        assert!(recipe().validate().is_ok());

        let mut zero_time = recipe();
        zero_time.cooking_time = 0;
        assert!(zero_time.validate().is_err());

        let mut no_tags = recipe();
        no_tags.tags.clear();
        assert!(no_tags.validate().is_err());

        let mut duplicate = recipe();
        duplicate.ingredients.push(IngredientAmount { id: 1, amount: 3 });
        assert_eq!(
            problems(duplicate.validate().unwrap_err()),
            vec!["ingredients: each ingredient may appear only once".to_string()]
        );

        let mut zero_amount = recipe();
        zero_amount.ingredients[0].amount = 0;
        assert_eq!(
            problems(zero_amount.validate().unwrap_err()),
            vec!["ingredients[0].amount: must be at least 1".to_string()]
        );
    }
}
