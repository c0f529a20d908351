use std::process::Output;

use color_eyre::{eyre::eyre, Report, Section, SectionExt};

pub fn ensure_exit_ok(program: &str, output: &Output) -> color_eyre::Result<(), Report> {
    if output.status.success() {
        return Ok(());
    }
    let exit_code = format!("{:?}", output.status.code()).header("status code:");
    let stderr = String::from_utf8_lossy(&output.stderr)
        .trim()
        .to_string()
        .header("stderr:");

    Err(eyre!("{program} exited unsuccessfully")
        .section(exit_code)
        .section(stderr))
}
