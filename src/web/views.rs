use std::fmt::Write;

use crate::collection::Collection;
use crate::models::Category;

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 2rem auto; max-width: 60rem; }
table { border-collapse: collapse; width: 100%; margin-top: 1rem; }
th, td { border-bottom: 1px solid #ddd; padding: .4rem; text-align: left; }
.notice { background: #fff4d6; border: 1px solid #e8c25d; padding: 1rem; }
"#;

const SCRIPT: &str = r#"
const form = document.getElementById('upload-form');
const status = document.getElementById('upload-status');
const rows = document.getElementById('upload-files');

async function refreshUploadFiles() {
  const res = await fetch('/api/upload_file');
  if (!res.ok) { return; }
  const data = await res.json();
  rows.innerHTML = '';
  for (const item of data.items) {
    const tr = document.createElement('tr');
    for (const value of [item.title, item.upload_file_key, item.transcoding_stage_name,
                         item.transcoding_progress, item.created_at]) {
      const td = document.createElement('td');
      td.textContent = value === null ? '' : value;
      tr.appendChild(td);
    }
    rows.appendChild(tr);
  }
  if (data.auto_reload) { setTimeout(refreshUploadFiles, 5000); }
}

form.addEventListener('submit', async (event) => {
  event.preventDefault();
  const fields = new FormData(form);
  const file = fields.get('upload-file');
  fields.delete('upload-file');
  status.textContent = 'Creating upload URL...';
  const res = await fetch('/api/upload/create_url', {
    method: 'POST',
    body: new URLSearchParams(fields),
  });
  const data = await res.json();
  if (!res.ok) { status.textContent = data.error; return; }
  const upload = new FormData();
  upload.append('upload-file', file);
  status.textContent = 'Uploading...';
  await fetch(data.result.upload_url, { method: 'POST', body: upload, mode: 'no-cors' });
  status.textContent = 'Uploaded.';
  refreshUploadFiles();
});

refreshUploadFiles();
"#;

/// Render the index page.
///
/// `exists_config` is false when no `kollus` settings were found; `connected`
/// is false when they were found but incomplete.
pub fn index_page(exists_config: bool, connected: bool, categories: &Collection<Category>) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Kollus Upload</title>\n");
    let _ = writeln!(html, "<style>{STYLE}</style>");
    html.push_str("</head>\n<body>\n<h1>Kollus Upload</h1>\n");

    if !exists_config {
        html.push_str(
            "<div class=\"notice\">No Kollus settings found. Create <code>config.yml</code> \
             with a <code>kollus</code> section (domain, version, service_account.key, \
             service_account.api_access_token) and restart.</div>\n",
        );
    } else if !connected {
        html.push_str(
            "<div class=\"notice\">Kollus settings are incomplete: domain, version and \
             both service account credentials are required.</div>\n",
        );
    } else {
        upload_form(&mut html, categories);
        html.push_str(
            "<table>\n<thead><tr><th>Title</th><th>Upload file key</th><th>Stage</th>\
             <th>Progress</th><th>Created</th></tr></thead>\n\
             <tbody id=\"upload-files\"></tbody>\n</table>\n",
        );
        let _ = writeln!(html, "<script>{SCRIPT}</script>");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn upload_form(html: &mut String, categories: &Collection<Category>) {
    html.push_str("<form id=\"upload-form\">\n<label>Category <select name=\"category_key\">\n");
    html.push_str("<option value=\"\">(none)</option>\n");
    for category in categories {
        let _ = writeln!(
            html,
            "<option value=\"{}\">{} ({})</option>",
            html_escape::encode_double_quoted_attribute(category.key.as_deref().unwrap_or("")),
            html_escape::encode_text(category.name.as_deref().unwrap_or("")),
            category.count_of_media_contents.unwrap_or(0),
        );
    }
    html.push_str("</select></label>\n");
    html.push_str("<label>Title <input type=\"text\" name=\"title\"></label>\n");
    html.push_str("<label><input type=\"checkbox\" name=\"use_encryption\" value=\"1\"> Encrypt</label>\n");
    html.push_str("<label><input type=\"checkbox\" name=\"is_audio_upload\" value=\"1\"> Audio</label>\n");
    html.push_str("<input type=\"file\" name=\"upload-file\" required>\n");
    html.push_str("<button type=\"submit\">Upload</button> <span id=\"upload-status\"></span>\n</form>\n");
}
