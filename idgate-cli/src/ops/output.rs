use clap::ValueEnum;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

/// JSON 模式下直接输出；返回 false 表示调用方需要自行渲染表格
pub fn print_json<T: serde::Serialize>(value: &T, output: OutputFormat) -> anyhow::Result<bool> {
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(true)
        }
        OutputFormat::Table => Ok(false),
    }
}
