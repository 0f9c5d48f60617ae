use formula_core::catalog::IngredientFilter;
use formula_core::export::{
    export_multi_to_path, export_rows, export_to_path, write_csv, write_multi_csv,
};
use formula_core::units::parse_dose_value;
use formula_core::*;
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "formulary")]
#[command(about = "Supplement formula builder and compliance checker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Act as this owner instead of the configured one
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Read configuration from this file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and import the ingredient catalog
    Ingredients {
        #[command(subcommand)]
        command: IngredientCommands,
    },

    /// Create and edit formulas
    Formula {
        #[command(subcommand)]
        command: FormulaCommands,
    },

    /// Run a compliance check and print the report as JSON
    Check {
        id: u64,

        /// Print only status and counts
        #[arg(long)]
        summary: bool,

        /// Exit with status 2 when the formula cannot proceed
        #[arg(long)]
        strict: bool,
    },

    /// Export one or more formulas as CSV
    Export {
        #[arg(required = true)]
        ids: Vec<u64>,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum IngredientCommands {
    /// Import ingredients from CSV (update or create by name)
    Import { path: PathBuf },

    /// List ingredients
    List {
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        safety: Option<String>,

        /// Search name, category and source
        #[arg(long)]
        search: Option<String>,

        /// Hide RISK ingredients
        #[arg(long)]
        exclude_risk: bool,
    },

    /// Show one ingredient as JSON
    Show { name: String },

    /// Catalog statistics
    Stats,

    /// Distinct categories
    Categories,

    /// Distinct sources
    Sources,
}

#[derive(Subcommand)]
enum FormulaCommands {
    Create {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// US, EU, CA or AU
        #[arg(long)]
        region: Option<String>,
    },

    List,

    Show { id: u64 },

    Update {
        id: u64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        region: Option<String>,
    },

    Delete { id: u64 },

    /// Add an ingredient to a formula
    Add {
        id: u64,

        #[arg(long)]
        ingredient: String,

        #[arg(long, allow_hyphen_values = true)]
        dose: String,

        /// mg, mcg, g or IU
        #[arg(long)]
        unit: String,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Change an item's dose, unit or notes
    Set {
        id: u64,
        item: u64,

        #[arg(long, allow_hyphen_values = true)]
        dose: Option<String>,

        #[arg(long)]
        unit: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    Remove { id: u64, item: u64 },

    /// Reorder items; list every item id in the new order
    Reorder {
        id: u64,

        #[arg(required = true)]
        items: Vec<u64>,
    },

    Duplicate {
        id: u64,

        #[arg(long)]
        name: String,
    },
}

struct Context {
    config: Config,
    owner: String,
    rules: RuleTable,
}

impl Context {
    fn catalog_path(&self) -> PathBuf {
        self.config.data.catalog_path()
    }

    fn formulas_path(&self) -> PathBuf {
        self.config.data.formulas_path()
    }

    fn catalog(&self) -> Result<IngredientCatalog> {
        IngredientCatalog::load_or_default(&self.catalog_path())
    }

    fn book(&self) -> Result<FormulaBook> {
        FormulaBook::load(&self.formulas_path())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    formula_core::logging::init_with_level(if cli.verbose { "debug" } else { "warn" });

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }

    let ctx = Context {
        owner: cli.owner.unwrap_or_else(|| config.owner.name.clone()),
        rules: config.rule_table()?,
        config,
    };

    match cli.command {
        Commands::Ingredients { command } => cmd_ingredients(&ctx, command)?,
        Commands::Formula { command } => cmd_formula(&ctx, command)?,
        Commands::Check {
            id,
            summary,
            strict,
        } => return cmd_check(&ctx, id, summary, strict),
        Commands::Export { ids, output } => cmd_export(&ctx, &ids, output.as_deref())?,
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_ingredients(ctx: &Context, command: IngredientCommands) -> Result<()> {
    match command {
        IngredientCommands::Import { path } => {
            let summary = IngredientCatalog::update(&ctx.catalog_path(), |catalog| {
                let summary = catalog.import_csv_path(&path)?;
                for problem in catalog.validate() {
                    tracing::warn!("Catalog problem after import: {}", problem);
                }
                Ok(summary)
            })?;

            println!(
                "✓ Imported ingredients: {} created, {} updated, {} skipped",
                summary.created, summary.updated, summary.skipped
            );
        }

        IngredientCommands::List {
            category,
            source,
            safety,
            search,
            exclude_risk,
        } => {
            let catalog = ctx.catalog()?;
            let filter = IngredientFilter {
                category,
                source,
                safety,
                search,
                exclude_risk,
            };

            let found = catalog.filter(&filter, &ctx.rules);
            if found.is_empty() {
                println!("No ingredients found.");
            }
            for ingredient in found {
                println!(
                    "{:>4}  {:<28} {:<14} {}",
                    ingredient.id,
                    ingredient.name,
                    ingredient.category,
                    ingredient.safety_level_with(&ctx.rules)
                );
            }
        }

        IngredientCommands::Show { name } => {
            let catalog = ctx.catalog()?;
            let ingredient = catalog
                .find_by_name(&name)
                .ok_or_else(|| Error::UnknownIngredient(name.clone()))?;
            let level = ingredient.safety_level_with(&ctx.rules);

            let value = serde_json::json!({
                "id": ingredient.id,
                "name": ingredient.name,
                "category": ingredient.category,
                "source": ingredient.source,
                "safety": ingredient.safety,
                "evidence": ingredient.evidence,
                "safety_level": level,
                "safety_color": level.color(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }

        IngredientCommands::Stats => {
            let stats = ctx.catalog()?.stats(&ctx.rules);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        IngredientCommands::Categories => {
            for category in ctx.catalog()?.categories() {
                println!("{}", category);
            }
        }

        IngredientCommands::Sources => {
            for source in ctx.catalog()?.sources() {
                println!("{}", source);
            }
        }
    }

    Ok(())
}

fn cmd_formula(ctx: &Context, command: FormulaCommands) -> Result<()> {
    let path = ctx.formulas_path();
    let owner = ctx.owner.as_str();

    match command {
        FormulaCommands::Create {
            name,
            description,
            region,
        } => {
            let region = match region {
                Some(r) => r.parse()?,
                None => ctx.config.formula.default_region,
            };
            let new = NewFormula {
                name,
                description,
                region,
            };

            let (id, name) = FormulaBook::update(&path, |book| {
                let formula = book.create_formula(owner, new)?;
                Ok((formula.id, formula.name.clone()))
            })?;
            println!("✓ Created formula {}: {}", id, name);
        }

        FormulaCommands::List => {
            let book = ctx.book()?;
            let catalog = ctx.catalog()?;

            let formulas = book.list_formulas(owner);
            if formulas.is_empty() {
                println!("No formulas yet.");
            }
            for formula in formulas {
                let resolved = formula.resolve(&catalog)?;
                let summary = compliance_summary(&resolved, &ctx.rules);
                println!(
                    "{:>4}  {:<28} {}  {:>2} ingredients  {}",
                    formula.id,
                    formula.name,
                    formula.region,
                    formula.ingredient_count(),
                    summary.status
                );
            }
        }

        FormulaCommands::Show { id } => {
            let book = ctx.book()?;
            let catalog = ctx.catalog()?;
            let formula = book.get(owner, id)?;
            display_formula(formula, &formula.resolve(&catalog)?, &ctx.rules);
        }

        FormulaCommands::Update {
            id,
            name,
            description,
            region,
        } => {
            let patch = FormulaPatch {
                name,
                description,
                region: region.map(|r| r.parse()).transpose()?,
            };
            FormulaBook::update(&path, |book| {
                book.update_formula(owner, id, patch)?;
                Ok(())
            })?;
            println!("✓ Updated formula {}", id);
        }

        FormulaCommands::Delete { id } => {
            let deleted = FormulaBook::update(&path, |book| book.delete_formula(owner, id))?;
            println!(
                "✓ Deleted formula {} ({} items)",
                deleted.id,
                deleted.items.len()
            );
        }

        FormulaCommands::Add {
            id,
            ingredient,
            dose,
            unit,
            notes,
        } => {
            let catalog = ctx.catalog()?;
            let ingredient = catalog
                .find_by_name(&ingredient)
                .ok_or_else(|| Error::UnknownIngredient(ingredient.clone()))?;
            let new = NewItem {
                dose_value: parse_dose_value(&dose)?,
                dose_unit: DoseUnit::parse(&unit),
                notes,
            };

            let item = FormulaBook::update(&path, |book| {
                Ok(book.add_ingredient(owner, id, ingredient, new)?.clone())
            })?;
            println!(
                "✓ Added {} ({}) as item {}",
                ingredient.name,
                item.dose_label(),
                item.id
            );
        }

        FormulaCommands::Set {
            id,
            item,
            dose,
            unit,
            notes,
        } => {
            let patch = ItemPatch {
                dose_value: dose.as_deref().map(parse_dose_value).transpose()?,
                dose_unit: unit.as_deref().map(DoseUnit::parse),
                notes,
            };
            let updated = FormulaBook::update(&path, |book| {
                Ok(book.update_ingredient(owner, id, item, patch)?.clone())
            })?;
            println!("✓ Item {} is now {}", updated.id, updated.dose_label());
        }

        FormulaCommands::Remove { id, item } => {
            FormulaBook::update(&path, |book| book.remove_ingredient(owner, id, item))?;
            println!("✓ Removed item {} from formula {}", item, id);
        }

        FormulaCommands::Reorder { id, items } => {
            FormulaBook::update(&path, |book| {
                book.reorder_items(owner, id, &items)?;
                Ok(())
            })?;
            println!("✓ Reordered formula {}", id);
        }

        FormulaCommands::Duplicate { id, name } => {
            let new_id = FormulaBook::update(&path, |book| {
                Ok(book.duplicate_formula(owner, id, &name)?.id)
            })?;
            println!("✓ Duplicated formula {} as {}: {}", id, new_id, name.trim());
        }
    }

    Ok(())
}

fn cmd_check(ctx: &Context, id: u64, summary_only: bool, strict: bool) -> Result<ExitCode> {
    let book = ctx.book()?;
    let catalog = ctx.catalog()?;
    let formula = book.get(&ctx.owner, id)?;
    let resolved = formula.resolve(&catalog)?;

    let report = check_compliance(formula, &resolved, &ctx.rules, chrono::Utc::now());
    let json = if summary_only {
        serde_json::to_string_pretty(&report.summary())?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", json);

    if strict && !report.can_proceed {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_export(ctx: &Context, ids: &[u64], output: Option<&Path>) -> Result<()> {
    let book = ctx.book()?;
    let catalog = ctx.catalog()?;

    let mut batches = Vec::with_capacity(ids.len());
    for &id in ids {
        let formula = book.get(&ctx.owner, id)?;
        let resolved = formula.resolve(&catalog)?;
        if resolved.is_empty() {
            return Err(Error::EmptyFormula(id));
        }
        batches.push((formula, resolved));
    }

    match (batches.as_slice(), output) {
        ([(_, items)], Some(path)) => {
            export_to_path(path, &export_rows(items, &ctx.rules))?;
            println!("✓ Exported to {}", path.display());
        }
        ([(_, items)], None) => {
            write_csv(io::stdout().lock(), &export_rows(items, &ctx.rules))?;
        }
        (_, Some(path)) => {
            export_multi_to_path(path, &batches, &ctx.rules)?;
            println!("✓ Exported {} formulas to {}", batches.len(), path.display());
        }
        (_, None) => {
            write_multi_csv(io::stdout().lock(), &batches, &ctx.rules)?;
        }
    }

    Ok(())
}

fn display_formula(formula: &Formula, items: &[ResolvedItem<'_>], rules: &RuleTable) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  FORMULA {}  [{}]", formula.id, formula.region);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  {}", formula.name);
    if !formula.description.is_empty() {
        println!("  {}", formula.description);
    }
    println!();

    if items.is_empty() {
        println!("  (no ingredients)");
    }
    for resolved in items {
        println!(
            "  {:>3}. {:<28} {:>10}  {}",
            resolved.item.id,
            resolved.ingredient.name,
            resolved.item.dose_label(),
            resolved.ingredient.safety_level_with(rules)
        );
        if !resolved.item.notes.is_empty() {
            println!("       → {}", resolved.item.notes);
        }
    }

    println!();
    println!("  Status: {}", compliance_summary(items, rules).status);
    println!();
}
