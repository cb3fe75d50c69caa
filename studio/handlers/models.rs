use std::io::Cursor;
use tiny_http::{Request, Response};
use tracing::info;

use nn_workbench::store::{Framework, ModelId, ModelKind, NewModel};

use crate::state::{lock, lock_store, FlashMessage, SharedState};
use crate::util::form::{form_get, read_form};

const MAX_NAME_LEN: usize = 100;

// ---------------------------------------------------------------------------
// POST /models
// ---------------------------------------------------------------------------

/// Creates a model from the form and makes it the active one.
pub fn handle_create(request: &mut Request, state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let fields = read_form(request);
    let name = form_get(&fields, "name").unwrap_or("");
    let kind = form_get(&fields, "type").and_then(ModelKind::parse);
    let framework = form_get(&fields, "framework").and_then(Framework::parse);

    let flash = match (name, kind, framework) {
        ("", _, _) => FlashMessage::error("Model name is required."),
        (n, _, _) if n.chars().count() > MAX_NAME_LEN => {
            FlashMessage::error(format!("Model name must be at most {} characters.", MAX_NAME_LEN))
        }
        (_, None, _) => FlashMessage::error("Choose a model type."),
        (_, _, None) => FlashMessage::error("Choose a framework."),
        (name, Some(kind), Some(framework)) => {
            let store = lock(&state).store.clone();
            let mut store = lock_store(&store);
            let id = store.add_model(NewModel { name: name.to_owned(), kind, framework });
            match store.set_active_model(&id) {
                Ok(()) => {
                    info!(%id, model = %name, "model created");
                    FlashMessage::success(format!("Created model {}.", name))
                }
                Err(e) => FlashMessage::error(e.to_string()),
            }
        }
    };

    lock(&state).flash = Some(flash);
    crate::routes::redirect("/")
}

// ---------------------------------------------------------------------------
// POST /models/activate
// ---------------------------------------------------------------------------

pub fn handle_activate(request: &mut Request, state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let fields = read_form(request);
    let id = ModelId(form_get(&fields, "id").unwrap_or("").to_owned());

    let store = lock(&state).store.clone();
    let result = lock_store(&store).set_active_model(&id);

    if let Err(e) = result {
        lock(&state).flash = Some(FlashMessage::error(e.to_string()));
    }
    crate::routes::redirect("/")
}
