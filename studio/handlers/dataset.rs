use std::io::{Cursor, Read};

use tiny_http::{Request, Response};
use tracing::warn;

use nn_workbench::data::accept;
use nn_workbench::store::DatasetId;
use nn_workbench::Error;

use crate::state::{lock, lock_store, FlashMessage, SharedState};
use crate::util::form::{form_get, read_form};
use crate::util::multipart::{extract_boundary, extract_files};

// ---------------------------------------------------------------------------
// POST /datasets/upload
// ---------------------------------------------------------------------------

pub fn handle_upload(request: &mut Request, state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let content_type = request.headers().iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_owned())
        .unwrap_or_default();

    let boundary = match extract_boundary(&content_type) {
        Some(b) => b,
        None    => return flash_and_return(&state, FlashMessage::error("Invalid multipart request.")),
    };

    let (limit, store) = {
        let st = lock(&state);
        (st.config.max_upload_bytes, st.store.clone())
    };

    // Read one byte past the limit to tell "exactly at" from "over".
    let mut body: Vec<u8> = Vec::new();
    if let Err(e) = request.as_reader().take(limit as u64 + 1).read_to_end(&mut body) {
        warn!(error = %e, "upload body could not be read");
        return flash_and_return(&state, FlashMessage::error("Upload was interrupted."));
    }
    if body.len() > limit {
        let mb = limit / (1024 * 1024);
        return flash_and_return(&state, FlashMessage::error(format!("File exceeds {} MB limit.", mb)));
    }

    let files = extract_files(&body, &boundary);
    let name = files.first().map(|f| f.name.clone()).unwrap_or_default();

    // Parsing runs unlocked; the store is held only to record the dataset.
    let result = accept(files).map(|upload| upload.commit(&mut lock_store(&store)));
    let mut st = lock(&state);
    let flash = match result {
        Ok(report) => {
            let text = format!(
                "Uploaded {}: {} rows, {} columns, {} missing value(s); {} row(s) usable for training.",
                name,
                report.summary.row_count,
                report.summary.column_count,
                report.summary.missing_value_count,
                report.usable_rows,
            );
            st.last_summary = Some((name, report.summary));
            FlashMessage::success(text)
        }
        Err(Error::FileCount(0)) => FlashMessage::error("Choose a file to upload."),
        Err(e) if e.is_data_error() => FlashMessage::error(format!("Upload rejected: {}", e)),
        Err(e) => FlashMessage::error(e.to_string()),
    };
    st.flash = Some(flash);
    drop(st);

    crate::routes::redirect("/")
}

// ---------------------------------------------------------------------------
// POST /datasets/remove
// ---------------------------------------------------------------------------

pub fn handle_remove(request: &mut Request, state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let fields = read_form(request);
    let id = DatasetId(form_get(&fields, "id").unwrap_or("").to_owned());

    let store = lock(&state).store.clone();
    let removed = lock_store(&store).remove_dataset(&id);

    let flash = match removed {
        Some(d) => FlashMessage::success(format!("Removed dataset {}.", d.name)),
        None    => FlashMessage::error(Error::UnknownDataset(id.to_string()).to_string()),
    };
    flash_and_return(&state, flash)
}

fn flash_and_return(state: &SharedState, flash: FlashMessage) -> Response<Cursor<Vec<u8>>> {
    lock(state).flash = Some(flash);
    crate::routes::redirect("/")
}
