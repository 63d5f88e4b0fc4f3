use crate::cmd::TypesArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_types, type_rows, OutputFormat};

pub fn run(_args: TypesArgs, format: OutputFormat) -> CliResult<i32> {
    print_types(&type_rows(), format);
    Ok(SUCCESS)
}
