use std::{env, process::ExitCode};

use dynidl::{Context, DynData, Module, ModuleTree, Severity, TypeBuilder};
use serde::Serialize;

/// One module's worth of registry output.
#[derive(Serialize)]
struct ModuleDump {
    name: String,
    types: Vec<serde_json::Value>,
    constants: Vec<ConstantDump>,
    modules: Vec<ModuleDump>,
}

#[derive(Serialize)]
struct ConstantDump {
    name: String,
    value: DynData,
    from_enum: bool,
}

fn dump_module(tree: &ModuleTree, module: &Module) -> ModuleDump {
    ModuleDump {
        name: module.name().to_owned(),
        types: module
            .types()
            .map(|builder: &TypeBuilder| serde_json::to_value(builder.build()).unwrap_or(serde_json::Value::Null))
            .collect(),
        constants: module
            .constants()
            .map(|(name, value)| ConstantDump {
                name: name.to_owned(),
                value: value.clone(),
                from_enum: module.constant_is_from_enum(name),
            })
            .collect(),
        modules: module
            .submodules()
            .map(|(_, child)| dump_module(tree, tree.module(child)))
            .collect(),
    }
}

fn usage() -> ExitCode {
    eprintln!("usage: dynidl <file.idl> [--type FQ::Name] [--include PATH]... [--preprocess]");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut file = None;
    let mut target_type = None;
    let mut include_paths = Vec::new();
    let mut preprocess = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--type" => match iter.next() {
                Some(name) => target_type = Some(name.clone()),
                None => return usage(),
            },
            "--include" => match iter.next() {
                Some(path) => include_paths.push(path.clone()),
                None => return usage(),
            },
            "--preprocess" => preprocess = true,
            _ if file.is_none() => file = Some(arg.clone()),
            _ => return usage(),
        }
    }
    let Some(file) = file else {
        return usage();
    };

    let ctx: Context = if let Some(type_name) = &target_type {
        dynidl::parse_file_for_type(&file, type_name, &include_paths, None)
    } else {
        let mut ctx = Context::new();
        ctx.preprocessor.preprocess = preprocess || !include_paths.is_empty();
        ctx.preprocessor.include_paths = include_paths;
        dynidl::parse_file_with_context(&file, &mut ctx);
        ctx
    };

    for diagnostic in ctx.diagnostics() {
        eprintln!("{diagnostic}");
    }
    if !ctx.success() {
        eprintln!("error: parsing '{file}' failed");
        return ExitCode::FAILURE;
    }

    let Some(tree) = ctx.module_tree() else {
        eprintln!("error: no registry was produced");
        return ExitCode::FAILURE;
    };
    let dump = dump_module(tree, tree.module(tree.root()));
    match serde_json::to_string_pretty(&dump) {
        Ok(json) => {
            println!("{json}");
            if ctx.diagnostics().iter().any(|d| d.severity() == Severity::Warning) {
                eprintln!("completed with warnings");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: cannot serialize the registry: {err}");
            ExitCode::FAILURE
        }
    }
}
