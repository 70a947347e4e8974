//! Immutable lookup table of identity-provider environments.

// self
use crate::{
	_prelude::*,
	auth::EnvironmentId,
	provider::EnvironmentConfig,
};

/// Errors raised while assembling an [`EnvironmentRegistry`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum RegistryError {
	/// No environment was registered.
	#[error("At least one environment must be registered.")]
	Empty,
	/// Two environments share an identifier.
	#[error("Environment `{id}` is registered more than once.")]
	Duplicate {
		/// Duplicated identifier.
		id: String,
	},
	/// No default environment was designated.
	#[error("No default environment was designated.")]
	MissingDefault,
	/// More than one default environment was designated.
	#[error("Environments `{first}` and `{second}` are both marked as default.")]
	MultipleDefaults {
		/// First default encountered.
		first: String,
		/// Second default encountered.
		second: String,
	},
	/// The designated default is not registered.
	#[error("Default environment `{id}` is not registered.")]
	UnknownDefault {
		/// Designated identifier.
		id: String,
	},
}

/// Process-wide environment table, built once at startup and read-only afterwards.
///
/// Resolution is a pure lookup; flows receive the resolved [`EnvironmentConfig`] as an explicit
/// argument instead of mutating any shared client configuration per request.
#[derive(Clone, Debug)]
pub struct EnvironmentRegistry {
	environments: BTreeMap<EnvironmentId, Arc<EnvironmentConfig>>,
	default: EnvironmentId,
}
impl EnvironmentRegistry {
	/// Starts a new registry builder.
	pub fn builder() -> EnvironmentRegistryBuilder {
		EnvironmentRegistryBuilder::default()
	}

	/// Resolves an environment by identifier.
	pub fn resolve(&self, id: &str) -> Result<&Arc<EnvironmentConfig>> {
		self.environments.get(id).ok_or_else(|| Error::UnknownEnvironment { id: id.to_owned() })
	}

	/// Resolves the requested environment, falling back to the default when none is given.
	pub fn resolve_or_default(&self, id: Option<&str>) -> Result<&Arc<EnvironmentConfig>> {
		match id {
			Some(id) => self.resolve(id),
			None => Ok(self.default_environment()),
		}
	}

	/// Returns the default environment.
	pub fn default_environment(&self) -> &Arc<EnvironmentConfig> {
		// The builder guarantees the default is registered.
		&self.environments[&self.default]
	}

	/// Identifier of the default environment.
	pub fn default_id(&self) -> &EnvironmentId {
		&self.default
	}

	/// Iterates registered environments in identifier order.
	pub fn iter(&self) -> impl Iterator<Item = &Arc<EnvironmentConfig>> {
		self.environments.values()
	}

	/// Number of registered environments.
	pub fn len(&self) -> usize {
		self.environments.len()
	}

	/// Always false for a built registry; present for API symmetry with `len`.
	pub fn is_empty(&self) -> bool {
		self.environments.is_empty()
	}
}

/// Builder for [`EnvironmentRegistry`].
#[derive(Debug, Default)]
pub struct EnvironmentRegistryBuilder {
	entries: Vec<(EnvironmentConfig, bool)>,
	default: Option<EnvironmentId>,
}
impl EnvironmentRegistryBuilder {
	/// Registers a non-default environment.
	pub fn register(mut self, config: EnvironmentConfig) -> Self {
		self.entries.push((config, false));

		self
	}

	/// Registers an environment and marks it as the default.
	pub fn register_default(mut self, config: EnvironmentConfig) -> Self {
		self.entries.push((config, true));

		self
	}

	/// Designates an already (or later) registered environment as the default.
	pub fn default_environment(mut self, id: EnvironmentId) -> Self {
		self.default = Some(id);

		self
	}

	/// Validates the table and freezes it.
	pub fn build(self) -> Result<EnvironmentRegistry, RegistryError> {
		if self.entries.is_empty() {
			return Err(RegistryError::Empty);
		}

		let mut environments = BTreeMap::new();
		let mut default = self.default;
		let mut flagged: Option<EnvironmentId> = None;

		for (config, is_default) in self.entries {
			if is_default {
				if let Some(first) =
					flagged.as_ref().or(default.as_ref()).filter(|first| *first != &config.id)
				{
					return Err(RegistryError::MultipleDefaults {
						first: first.to_string(),
						second: config.id.to_string(),
					});
				}

				flagged = Some(config.id.clone());
			}

			let id = config.id.clone();

			if environments.insert(id.clone(), Arc::new(config)).is_some() {
				return Err(RegistryError::Duplicate { id: id.to_string() });
			}
		}

		default = default.or(flagged);

		let default = default.ok_or(RegistryError::MissingDefault)?;

		if !environments.contains_key(&default) {
			return Err(RegistryError::UnknownDefault { id: default.to_string() });
		}

		Ok(EnvironmentRegistry { environments, default })
	}
}
