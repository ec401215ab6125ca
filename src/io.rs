use colored::*;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

pub const PRE_PROCESSING_PATH: &'static str = "./pre_processing";

pub const CASE_SETUP_FILE: &'static str = "case_setup.jou";

pub const POST_PROCESSING_PATH: &'static str = "./post_processing";

pub const CASE_PARAMETERS_FILE: &'static str = "case_parameters.jou";

pub const FLAG_STATISTICS_FILE: &'static str = "flag_statistics.dat";

pub const VTK_PATH: &'static str = "./post_processing/vtk_files";

#[derive(Clone, Debug, PartialEq)]
pub struct CasePaths {
    pub pre_processing: PathBuf,
    pub post_processing: PathBuf,
    pub vtk: PathBuf,
}

impl CasePaths {
    pub fn new<P>(root: P) -> Self
    where
        P: AsRef<Path>,
    {
        let root = root.as_ref();
        Self {
            pre_processing: root.join(PRE_PROCESSING_PATH),
            post_processing: root.join(POST_PROCESSING_PATH),
            vtk: root.join(VTK_PATH),
        }
    }

    pub fn case_setup(&self) -> PathBuf {
        self.pre_processing.join(CASE_SETUP_FILE)
    }

    pub fn case_parameters(&self) -> PathBuf {
        self.post_processing.join(CASE_PARAMETERS_FILE)
    }

    pub fn flag_statistics(&self) -> PathBuf {
        self.post_processing.join(FLAG_STATISTICS_FILE)
    }
}

impl Default for CasePaths {
    fn default() -> Self {
        Self::new(".")
    }
}

pub fn create_case_directories(paths: &CasePaths) -> io::Result<()> {
    let list_of_paths = [&paths.pre_processing, &paths.post_processing, &paths.vtk];
    for path in list_of_paths {
        if !path.exists() {
            println!(
                "Creating the {} path.\n",
                path.display().to_string().yellow().bold()
            );
            fs::create_dir_all(path)?;
        }
    }
    Ok(())
}

pub fn read_case_setup(
    paths: &CasePaths,
    default_contents: &str,
) -> io::Result<HashMap<String, String>> {
    let path = paths.case_setup();
    let path_str = path.display().to_string();
    if path.exists() {
        println!("Reading the case setup file: {}.\n", path_str.yellow().bold());
    } else {
        println!(
            "Creating the default case setup file: {}.\n",
            path_str.yellow().bold()
        );
        let mut file = File::create(&path)?;
        write!(file, "{}", default_contents)?;
    }
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(extract_parameters(&contents))
}

pub fn extract_parameters(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.starts_with("#"))
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut parts = line.splitn(2, "=");
            let key = parts.next().unwrap_or("").trim().to_string();
            let value = parts.next().unwrap_or("").trim().to_string();
            (key, value)
        })
        .collect::<HashMap<String, String>>()
}
