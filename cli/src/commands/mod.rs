mod helpers;
mod history;
mod pick;
mod recipe;
mod suggest;

pub(crate) use helpers::today;
pub(crate) use history::cmd_history;
pub(crate) use pick::{cmd_pick, cmd_today, cmd_unpick};
pub(crate) use recipe::{
    cmd_browse, cmd_categories, cmd_recipe_add, cmd_recipe_delete, cmd_recipe_edit,
    cmd_recipe_list,
};
pub(crate) use suggest::cmd_suggest;
