pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const SHOPPING_LIST_HEADER: &str = "Список ингредиентов:";
pub const SHOPPING_LIST_FILENAME_FORMAT: &str = "%d-%m-%Y-%H-%M";

pub const SHORT_LINK_PREFIX: &str = "/s/";
pub const RECIPE_PAGE_PREFIX: &str = "/recipes/";
pub const MEDIA_URL_PREFIX: &str = "/media/";

pub const RECIPE_NOT_FOUND: &str = "Recipe not found";
pub const USER_NOT_FOUND: &str = "User not found";
pub const TAG_NOT_FOUND: &str = "Tag not found";
pub const INGREDIENT_NOT_FOUND: &str = "Ingredient not found";
pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided";
