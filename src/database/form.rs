use std::{collections::BTreeSet, str::FromStr};

use base64::{engine::general_purpose::STANDARD, Engine};
use garde::Validate;
use serde::Deserialize;

use super::error::{Error, ErrorKind, TypeError};
use crate::{
    schema::Id, INGREDIENT_FIELD_MAX_LENGTH, MAX_COOKING_TIME, MIN_COOKING_TIME,
    MIN_INGREDIENT_AMOUNT, RECIPE_NAME_MAX_LENGTH,
};

/// Query string parameters, keeping repeated keys (`tags=a&tags=b`).
#[derive(Debug, Default, Clone)]
pub struct Form {
    inner: Vec<(String, String)>,
}

impl Form {
    pub fn from_query(raw: &str) -> Result<Self, TypeError> {
        let inner: Vec<(String, String)> = serde_urlencoded::from_str(raw)
            .map_err(|_e| TypeError::new("Malformed query string"))?;

        Ok(Self { inner })
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.to_owned())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("Invalid number for '{key}'"))),
            None => Ok(None),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, TypeError> {
        match self.get_str(key) {
            Some("1" | "true" | "True") => Ok(Some(true)),
            Some("0" | "false" | "False") => Ok(Some(false)),
            Some(_) => Err(TypeError::new(&format!("Invalid boolean for '{key}'"))),
            None => Ok(None),
        }
    }
}

fn invalid(field: &str, info: &str) -> Error {
    ErrorKind::InvalidRequest.new(info).on(field)
}

/// Reports the first failed rule, bound to the field it was declared on.
fn report_error(report: garde::Report) -> Error {
    match report.iter().next() {
        Some((path, error)) => invalid(&path.to_string(), &error.to_string()),
        None => ErrorKind::InvalidRequest.default(),
    }
}

fn require_text(field: &str, value: &str, max_length: usize) -> Result<String, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid(field, "This field may not be blank"));
    }
    if value.chars().count() > max_length {
        return Err(invalid(
            field,
            &format!("Ensure this field has no more than {max_length} characters"),
        ));
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeImage {
    pub format: String,
    pub bytes: Vec<u8>,
}

fn image_format(subtype: &str) -> Result<String, Error> {
    let format = subtype.trim().to_ascii_lowercase();
    if format.is_empty()
        || format.len() > 16
        || !format.chars().all(|c| c.is_ascii_alphanumeric() || c == '+')
    {
        return Err(invalid("image", "Unsupported image format"));
    }
    Ok(format)
}

impl RecipeImage {
    /// Decodes `data:image/<format>;base64,<payload>`.
    pub fn from_data_uri(value: &str) -> Result<Self, Error> {
        let (header, payload) = value
            .strip_prefix("data:image/")
            .and_then(|rest| rest.split_once(";base64,"))
            .ok_or_else(|| invalid("image", "Expected a base64 encoded data:image URI"))?;

        let format = image_format(header)?;
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|_e| invalid("image", "Image payload is not valid base64"))?;
        if bytes.is_empty() {
            return Err(invalid("image", "The submitted image is empty"));
        }

        Ok(Self { format, bytes })
    }

    /// A multipart file part. Parts without an `image/*` content type are read
    /// as a data URI instead.
    pub fn from_upload(content_type: Option<&str>, bytes: Vec<u8>) -> Result<Self, Error> {
        let subtype = content_type
            .and_then(|ct| ct.split(';').next())
            .and_then(|ct| ct.trim().strip_prefix("image/"));

        let Some(subtype) = subtype else {
            let uri = std::str::from_utf8(&bytes)
                .map_err(|_e| invalid("image", "Expected an image upload"))?;
            return Self::from_data_uri(uri.trim());
        };

        let format = image_format(subtype)?;
        if bytes.is_empty() {
            return Err(invalid("image", "The submitted image is empty"));
        }

        Ok(Self { format, bytes })
    }

    pub fn to_data_uri(format: &str, bytes: &[u8]) -> String {
        format!("data:image/{format};base64,{}", STANDARD.encode(bytes))
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientEntry {
    pub id: Id,
    pub amount: i32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RecipeForm {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    #[serde(default)]
    pub image: Option<String>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientEntry>,
    /// Binary image from a multipart submission; takes precedence over `image`.
    #[serde(skip)]
    pub upload: Option<RecipeImage>,
}

/// A recipe submission that passed every field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<RecipeImage>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientEntry>,
}

impl RecipeForm {
    /// Assembles a `multipart/form-data` submission: the `recipe` part holds the
    /// same JSON object as a plain request, the `image` part an optional file.
    pub fn from_upload(recipe: Option<&[u8]>, image: Option<RecipeImage>) -> Result<Self, Error> {
        let recipe = recipe.ok_or_else(|| invalid("recipe", "This field is required"))?;
        let mut form: RecipeForm = serde_json::from_slice(recipe)
            .map_err(|e| invalid("recipe", &format!("Malformed recipe: {e}")))?;

        form.upload = image;
        Ok(form)
    }

    pub fn validate(self, require_image: bool) -> Result<RecipeDraft, Error> {
        let name = require_text("name", &self.name, RECIPE_NAME_MAX_LENGTH)?;
        let text = require_text("text", &self.text, usize::MAX)?;

        if self.cooking_time < MIN_COOKING_TIME {
            return Err(invalid(
                "cooking_time",
                &format!("Cooking time must be at least {MIN_COOKING_TIME} minute"),
            ));
        }
        if self.cooking_time > MAX_COOKING_TIME {
            return Err(invalid(
                "cooking_time",
                &format!("Cooking time must not exceed {MAX_COOKING_TIME} minutes"),
            ));
        }

        let image = match (self.upload, self.image.as_deref()) {
            (Some(upload), _) => Some(upload),
            (None, Some(uri)) => Some(RecipeImage::from_data_uri(uri)?),
            (None, None) if require_image => return Err(invalid("image", "This field is required")),
            (None, None) => None,
        };

        // Tags form a set; repeats are harmless.
        let tags: Vec<Id> = self
            .tags
            .into_iter()
            .collect::<BTreeSet<Id>>()
            .into_iter()
            .collect();
        if tags.is_empty() {
            return Err(invalid("tags", "At least one tag is required"));
        }

        if self.ingredients.is_empty() {
            return Err(invalid("ingredients", "At least one ingredient is required"));
        }
        let mut seen = BTreeSet::new();
        for entry in self.ingredients.iter() {
            if !seen.insert(entry.id) {
                return Err(invalid("ingredients", "Ingredients must be unique"));
            }
            if entry.amount < MIN_INGREDIENT_AMOUNT {
                return Err(invalid(
                    "ingredients",
                    &format!("Amount must be at least {MIN_INGREDIENT_AMOUNT}"),
                ));
            }
        }

        Ok(RecipeDraft {
            name,
            text,
            cooking_time: self.cooking_time,
            image,
            tags,
            ingredients: self.ingredients,
        })
    }
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct TagForm {
    #[garde(length(min = 1, max = 200))]
    pub name: String,
    #[garde(pattern(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$"))]
    pub color: String,
    #[garde(length(min = 1, max = 200), pattern(r"^[-a-zA-Z0-9_]+$"))]
    pub slug: String,
}

impl TagForm {
    pub fn validate(self) -> Result<TagForm, Error> {
        let form = TagForm {
            name: self.name.trim().to_string(),
            color: self.color.trim().to_string(),
            slug: self.slug.trim().to_string(),
        };
        Validate::validate(&form, &()).map_err(report_error)?;

        Ok(TagForm {
            color: normalize_color(&form.color)?,
            ..form
        })
    }
}

/// Accepts `#RGB` or `#RRGGBB`, returns `#RRGGBB` uppercased.
pub fn normalize_color(value: &str) -> Result<String, Error> {
    let digits = value
        .trim()
        .strip_prefix('#')
        .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| invalid("color", "Color must be a hex value like #E26C2D"))?;

    let digits = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => digits.to_string(),
        _ => return Err(invalid("color", "Color must be a hex value like #E26C2D")),
    };

    Ok(format!("#{}", digits.to_ascii_uppercase()))
}

#[derive(Deserialize, Debug, Clone)]
pub struct IngredientForm {
    pub name: String,
    pub measurement_unit: String,
}

impl IngredientForm {
    pub fn validate(self) -> Result<IngredientForm, Error> {
        Ok(IngredientForm {
            name: require_text("name", &self.name, INGREDIENT_FIELD_MAX_LENGTH)?,
            measurement_unit: require_text(
                "measurement_unit",
                &self.measurement_unit,
                INGREDIENT_FIELD_MAX_LENGTH,
            )?,
        })
    }
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct UserForm {
    #[garde(email, length(max = 254), custom(has_dotted_domain))]
    pub email: String,
    #[garde(length(min = 1, max = 150), pattern(r"^[\w.@+-]+$"))]
    pub username: String,
    #[garde(length(min = 1, max = 150))]
    pub first_name: String,
    #[garde(length(min = 1, max = 150))]
    pub last_name: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// Single-label domains (`cook@localhost`) pass the email rule but cannot receive mail.
fn has_dotted_domain(value: &str, _context: &()) -> garde::Result {
    let domain = value.rsplit_once('@').map(|(_, domain)| domain).unwrap_or_default();
    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err(garde::Error::new("not a valid email domain"));
    }
    Ok(())
}

impl UserForm {
    pub fn validate(self) -> Result<UserForm, Error> {
        let form = UserForm {
            email: self.email.trim().to_lowercase(),
            username: self.username.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            password: self.password,
        };
        Validate::validate(&form, &()).map_err(report_error)?;

        Ok(form)
    }
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct SetPasswordForm {
    #[garde(length(min = 1))]
    pub current_password: String,
    #[garde(length(min = 1))]
    pub new_password: String,
}

impl SetPasswordForm {
    pub fn validate(self) -> Result<SetPasswordForm, Error> {
        Validate::validate(&self, &()).map_err(report_error)?;
        Ok(self)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}
