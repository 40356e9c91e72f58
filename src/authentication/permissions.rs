use crate::{
    database::schema::{Recipe, User},
    Error, HtmlError,
};

/// Only the author may change or delete a recipe.
pub fn ensure_author(user: &User, recipe: &Recipe) -> Result<(), Error> {
    if recipe.author_id != user.id {
        return Err(
            HtmlError::Forbidden.new("You do not have permission to perform this action")
        );
    }
    Ok(())
}
