//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire settings, logging, the connection provider and the session factory.
//! - Run one student command through either persistence engine.
//! - Close the session factory exactly once before the process exits.

use log::error;
use std::process::ExitCode;
use students_core::{
    close_session_factory, init_logging, init_session_factory, AppConfig, ConnectionProvider,
    ErrorKind, OrmStudentRepository, RepoError, SqlStudentRepository, StudentId,
    StudentRepository, StudentService,
};

const USAGE: &str = "usage: students_cli <config.toml> <sql|orm> <command>
commands:
  list
  get <id>
  find <email>
  create <full_name> <email> [age]
  update <id> <full_name> [age]
  delete <id>";

// Runs the session factory shutdown when `main` returns, on every path.
struct ShutdownHook;

impl Drop for ShutdownHook {
    fn drop(&mut self) {
        close_session_factory();
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    }

    let config = match AppConfig::load(&args[0]) {
        Ok(config) => config.apply_env_overrides(),
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(&config.logging) {
        eprintln!("logging disabled: {err}");
    }

    let provider = match ConnectionProvider::new(config.database.clone()) {
        Ok(provider) => provider,
        Err(err) => {
            error!("event=cli_start module=cli status=error error={}", err);
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let factory = match init_session_factory(provider.clone()) {
        Ok(factory) => factory,
        Err(err) => {
            error!("event=cli_start module=cli status=error error={}", err);
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let _shutdown = ShutdownHook;

    let repo: Box<dyn StudentRepository> = match args[1].as_str() {
        "sql" => Box::new(SqlStudentRepository::new(provider)),
        "orm" => Box::new(OrmStudentRepository::new(factory)),
        other => {
            eprintln!("unknown engine `{other}`\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    let service = StudentService::new(repo);

    match run(&service, &args[2..]) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            match &err {
                CliError::Usage(message) => eprintln!("{message}\n{USAGE}"),
                CliError::Absent(message) | CliError::Output(message) => eprintln!("{message}"),
                CliError::Repo(err) => eprintln!("{err}"),
            }
            ExitCode::from(exit_status(&err))
        }
    }
}

#[derive(Debug)]
enum CliError {
    Usage(String),
    Absent(String),
    Output(String),
    Repo(RepoError),
}

// 2: bad invocation, 3: expected miss or rejected write, 1: anything else.
fn exit_status(err: &CliError) -> u8 {
    match err {
        CliError::Usage(_) => 2,
        CliError::Absent(_) => 3,
        CliError::Output(_) => 1,
        CliError::Repo(err) => match err.kind() {
            ErrorKind::NotFound | ErrorKind::ConstraintViolation => 3,
            ErrorKind::Connectivity | ErrorKind::Infrastructure => 1,
        },
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

fn run<R: StudentRepository>(
    service: &StudentService<R>,
    command: &[String],
) -> Result<String, CliError> {
    let name = command[0].as_str();
    let rest = &command[1..];
    match (name, rest) {
        ("list", []) => to_json(&service.read_all()?),
        ("get", [id]) => {
            let id = parse_id(id)?;
            let student = service.read(id)?.ok_or(RepoError::NotFound(id))?;
            to_json(&student)
        }
        ("find", [email]) => match service.read_by_email(email)? {
            Some(student) => to_json(&student),
            None => Err(CliError::Absent(format!("no student with email `{email}`"))),
        },
        ("create", [full_name, email, age @ ..]) => {
            let age = parse_age(age)?;
            to_json(&service.create(full_name, email, age)?)
        }
        ("update", [id, full_name, age @ ..]) => {
            let age = parse_age(age)?;
            to_json(&service.update(parse_id(id)?, full_name, age)?)
        }
        ("delete", [id]) => {
            let id = parse_id(id)?;
            if service.delete(id)? {
                Ok(format!("deleted {id}"))
            } else {
                Err(RepoError::NotFound(id).into())
            }
        }
        _ => Err(CliError::Usage(format!("unrecognized command `{name}`"))),
    }
}

fn parse_id(text: &str) -> Result<StudentId, CliError> {
    StudentId::parse_str(text).map_err(|_| CliError::Usage(format!("invalid uuid `{text}`")))
}

fn parse_age(rest: &[String]) -> Result<Option<i32>, CliError> {
    match rest {
        [] => Ok(None),
        [age] => age
            .parse()
            .map(Some)
            .map_err(|_| CliError::Usage(format!("invalid age `{age}`"))),
        _ => Err(CliError::Usage("too many arguments".to_string())),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::Output(format!("failed to encode output: {err}")))
}
