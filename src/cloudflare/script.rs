use super::error::CloudflareError;

/// Wrap rendered page HTML in a fetch-event worker that serves it verbatim
pub fn worker_script(html: &str) -> Result<String, CloudflareError> {
    // A JSON string literal is a valid JS string literal
    let literal = serde_json::to_string(html)?;
    Ok(format!(
        "const HTML = {literal};\n\
         \n\
         addEventListener('fetch', event => {{\n\
         \x20 event.respondWith(new Response(HTML, {{\n\
         \x20   headers: {{ 'Content-Type': 'text/html;charset=UTF-8' }},\n\
         \x20 }}));\n\
         }});\n"
    ))
}

/// Minimal script uploaded by the connectivity test when the worker is missing
pub fn placeholder_script() -> &'static str {
    "addEventListener('fetch', event => {\n  event.respondWith(new Response('Maintenance worker is provisioned', { status: 200 }));\n});\n"
}
