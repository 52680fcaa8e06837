use minijinja::{Environment, context};

use crate::error::GenerateError;
use crate::task::GenerationTask;

/// Render the Python wrapper module for a task's generated client and models.
pub fn render_enhancement(task: &GenerationTask) -> Result<String, GenerateError> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_template(
        "enhanced.py.j2",
        include_str!("../templates/enhanced.py.j2"),
    )?;
    let tmpl = env.get_template("enhanced.py.j2")?;

    Ok(tmpl.render(context! {
        module => task.name,
        package => task.package,
        models => task.model_module(),
        class_name => task.class_stem,
    })?)
}
