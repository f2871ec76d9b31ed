//! Loading of Hardhat compilation artifacts and ABI encoding of deployment arguments

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
    json_abi::{JsonAbi, Param},
};
use alloy_primitives::Bytes;
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    constants::{ARTIFACT_EXTENSION, BUILD_INFO_PATH_SEGMENT, DEBUG_FILE_EXTENSION},
    errors::ScriptError,
};

/// The subset of a Hardhat artifact used by the scripts
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: String,
    source_name: String,
    abi: JsonAbi,
    bytecode: Bytes,
}

/// A Hardhat debug file, pointing at the build info the artifact came from
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: String,
}

/// The subset of a Hardhat build info file needed for source verification
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildInfo {
    solc_long_version: String,
    input: serde_json::Value,
}

/// A compiled contract
#[derive(Clone, Debug)]
pub struct ContractArtifact {
    /// The name of the contract
    pub contract_name: String,
    /// The path of the source file the contract is defined in
    pub source_name: String,
    /// The contract ABI
    pub abi: JsonAbi,
    /// The contract creation bytecode
    pub bytecode: Bytes,
    /// The artifact file this was read from
    pub path: PathBuf,
}

/// Everything an Etherscan-compatible explorer needs to verify a contract
#[derive(Clone, Debug)]
pub struct SourceBundle {
    /// `<source path>:<contract name>`
    pub fully_qualified_name: String,
    /// The full compiler version, e.g. `v0.8.17+commit.8df45f5f`
    pub compiler_version: String,
    /// The solc standard JSON input the contract was compiled from
    pub standard_json_input: String,
}

/// A directory of Hardhat artifacts
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    /// The root of the artifacts directory
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store reading from the given artifacts directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load the artifact of the contract with the given name
    pub fn load(&self, contract_name: &str) -> Result<ContractArtifact, ScriptError> {
        let path = self.find_artifact(contract_name)?;
        ContractArtifact::from_file(path)
    }

    /// Load the sources and compiler settings the artifact was built from
    pub fn source_bundle(
        &self,
        artifact: &ContractArtifact,
    ) -> Result<SourceBundle, ScriptError> {
        let debug_path = artifact.path.with_extension(DEBUG_FILE_EXTENSION);
        let debug: DebugFile = read_json(&debug_path)?;

        let build_info_path = debug_path
            .parent()
            .unwrap_or(&self.root)
            .join(&debug.build_info);
        let build_info: BuildInfo = read_json(&build_info_path)?;

        let standard_json_input = serde_json::to_string(&build_info.input)
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

        Ok(SourceBundle {
            fully_qualified_name: format!("{}:{}", artifact.source_name, artifact.contract_name),
            compiler_version: format!("v{}", build_info.solc_long_version),
            standard_json_input,
        })
    }

    /// Find the unique artifact file for the given contract
    fn find_artifact(&self, contract_name: &str) -> Result<PathBuf, ScriptError> {
        let file_name = format!("{contract_name}.{ARTIFACT_EXTENSION}");
        let mut found = Vec::new();
        find_files(&self.root, &file_name, &mut found).map_err(|e| {
            ScriptError::ArtifactParsing(format!("{}: {}", self.root.display(), e))
        })?;

        match found.len() {
            0 => Err(ScriptError::ArtifactParsing(format!(
                "no artifact for `{contract_name}` under {}",
                self.root.display()
            ))),
            1 => Ok(found.remove(0)),
            _ => Err(ScriptError::ArtifactParsing(format!(
                "multiple artifacts for `{contract_name}`: {found:?}"
            ))),
        }
    }
}

impl ContractArtifact {
    /// Read an artifact from an explicit path, which need not lie in any
    /// artifacts directory
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ScriptError> {
        let path = path.into();
        let artifact: HardhatArtifact = read_json(&path)?;

        if artifact.bytecode.is_empty() {
            return Err(ScriptError::ArtifactParsing(format!(
                "`{}` has no bytecode, is it abstract or an interface?",
                artifact.contract_name
            )));
        }

        Ok(Self {
            contract_name: artifact.contract_name,
            source_name: artifact.source_name,
            abi: artifact.abi,
            bytecode: artifact.bytecode,
            path,
        })
    }

    /// The init code deploying this contract with the given constructor arguments
    pub fn deploy_code(&self, args: &[String]) -> Result<Bytes, ScriptError> {
        let encoded_args = self.encode_constructor_args(args)?;
        Ok([self.bytecode.as_ref(), &encoded_args].concat().into())
    }

    /// ABI-encode constructor arguments, coercing each to its parameter type
    pub fn encode_constructor_args(&self, args: &[String]) -> Result<Vec<u8>, ScriptError> {
        let Some(constructor) = &self.abi.constructor else {
            if args.is_empty() {
                return Ok(Vec::new());
            }
            return Err(ScriptError::CalldataConstruction(format!(
                "`{}` has no constructor but {} arguments were given",
                self.contract_name,
                args.len()
            )));
        };

        let values = coerce_args(&constructor.inputs, args)?;
        constructor
            .abi_encode_input(&values)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))
    }

    /// ABI-encode a call to the named function, selector included.
    ///
    /// Overloads are disambiguated by the number of arguments.
    pub fn encode_call(&self, function: &str, args: &[String]) -> Result<Vec<u8>, ScriptError> {
        let func = self
            .abi
            .function(function)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == args.len()))
            .ok_or_else(|| {
                ScriptError::CalldataConstruction(format!(
                    "`{}` has no function `{}` taking {} arguments",
                    self.contract_name,
                    function,
                    args.len()
                ))
            })?;

        let values = coerce_args(&func.inputs, args)?;
        func.abi_encode_input(&values)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))
    }
}

/// Parse string arguments into ABI values of the given parameter types
fn coerce_args(params: &[Param], args: &[String]) -> Result<Vec<DynSolValue>, ScriptError> {
    if params.len() != args.len() {
        return Err(ScriptError::CalldataConstruction(format!(
            "expected {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param
                .resolve()
                .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
            ty.coerce_str(arg).map_err(|e| {
                ScriptError::CalldataConstruction(format!(
                    "invalid value `{}` for `{}` ({}): {}",
                    arg, param.name, param.ty, e
                ))
            })
        })
        .collect()
}

/// Recursively collect the files with the given name, skipping build info
fn find_files(dir: &Path, file_name: &str, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if !path.ends_with(BUILD_INFO_PATH_SEGMENT) {
                find_files(&path, file_name, found)?;
            }
        } else if path.file_name().is_some_and(|name| name == file_name) {
            found.push(path);
        }
    }

    Ok(())
}

/// Read and deserialize a JSON file
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ScriptError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e)))
}
