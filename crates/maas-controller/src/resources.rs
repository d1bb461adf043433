//! Resource operations built on the request primitives.
//!
//! Results are returned as JSON values; typed entity models live above this
//! layer.

use maas_core::schema::{FieldType, SchemaError};
use maas_core::{Error, Params};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::files::AddFileArgs;
use crate::policy::OperationClass;
use crate::session::Controller;
use crate::Result;

/// Filters for listing devices. Empty fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicesArgs {
    /// Match this hostname
    pub hostname: String,
    /// Match any of these MAC addresses
    pub mac_addresses: Vec<String>,
    /// Match any of these system IDs
    pub system_ids: Vec<String>,
    /// Match this domain
    pub domain: String,
    /// Match this zone
    pub zone: String,
    /// Match this agent name
    pub agent_name: String,
}

impl DevicesArgs {
    fn params(&self) -> Params {
        let mut params = Params::new();
        params.maybe_add("hostname", &self.hostname);
        params.maybe_add_many("mac_address", &self.mac_addresses);
        params.maybe_add_many("id", &self.system_ids);
        params.maybe_add("domain", &self.domain);
        params.maybe_add("zone", &self.zone);
        params.maybe_add("agent_name", &self.agent_name);
        params
    }
}

/// Arguments for creating a device. At least one MAC address is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDeviceArgs {
    /// Requested hostname
    pub hostname: String,
    /// MAC addresses of the device
    pub mac_addresses: Vec<String>,
    /// Domain to place the device in
    pub domain: String,
    /// System ID of the parent node
    pub parent: String,
}

impl CreateDeviceArgs {
    fn params(&self) -> Params {
        let mut params = Params::new();
        params.maybe_add("hostname", &self.hostname);
        params.maybe_add("domain", &self.domain);
        params.maybe_add_many("mac_addresses", &self.mac_addresses);
        params.maybe_add("parent", &self.parent);
        params
    }
}

/// Filters for listing machines. Empty fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachinesArgs {
    /// Match any of these hostnames
    pub hostnames: Vec<String>,
    /// Match any of these MAC addresses
    pub mac_addresses: Vec<String>,
    /// Match any of these system IDs
    pub system_ids: Vec<String>,
    /// Match this domain
    pub domain: String,
    /// Match this zone
    pub zone: String,
    /// Match this agent name
    pub agent_name: String,
}

impl MachinesArgs {
    fn params(&self) -> Params {
        let mut params = Params::new();
        params.maybe_add_many("hostname", &self.hostnames);
        params.maybe_add_many("mac_address", &self.mac_addresses);
        params.maybe_add_many("id", &self.system_ids);
        params.maybe_add("domain", &self.domain);
        params.maybe_add("zone", &self.zone);
        params.maybe_add("agent_name", &self.agent_name);
        params
    }
}

/// Constraints for allocating a machine. Zero and empty values are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateMachineArgs {
    /// Allocate this specific hostname
    pub hostname: String,
    /// Required architecture
    pub architecture: String,
    /// Minimum CPU count
    pub min_cpu_count: u32,
    /// Minimum memory in MB
    pub min_memory: u32,
    /// Required tags
    pub tags: Vec<String>,
    /// Excluded tags
    pub not_tags: Vec<String>,
    /// Networks the machine must be attached to, by name, `ip:` or `vlan:`
    pub networks: Vec<String>,
    /// Networks the machine must not be attached to
    pub not_networks: Vec<String>,
    /// Required zone
    pub zone: String,
    /// Excluded zones
    pub not_in_zone: Vec<String>,
    /// Agent name to record
    pub agent_name: String,
    /// Comment for the event log
    pub comment: String,
    /// Check constraints without allocating
    pub dry_run: bool,
}

impl AllocateMachineArgs {
    fn params(&self) -> Params {
        let mut params = Params::new();
        params.maybe_add("name", &self.hostname);
        params.maybe_add("arch", &self.architecture);
        params.maybe_add_int("cpu_count", i64::from(self.min_cpu_count));
        params.maybe_add_int("mem", i64::from(self.min_memory));
        params.maybe_add_many("tags", &self.tags);
        params.maybe_add_many("not_tags", &self.not_tags);
        params.maybe_add_many("networks", &self.networks);
        params.maybe_add_many("not_networks", &self.not_networks);
        params.maybe_add("zone", &self.zone);
        params.maybe_add_many("not_in_zone", &self.not_in_zone);
        params.maybe_add("agent_name", &self.agent_name);
        params.maybe_add("comment", &self.comment);
        params.maybe_add_bool("dry_run", self.dry_run);
        params
    }
}

/// Machines to release, with an optional comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMachinesArgs {
    /// System IDs to release
    pub system_ids: Vec<String>,
    /// Comment for the event log
    pub comment: String,
}

impl ReleaseMachinesArgs {
    fn params(&self) -> Params {
        let mut params = Params::new();
        params.maybe_add_many("machines", &self.system_ids);
        params.maybe_add("comment", &self.comment);
        params
    }
}

fn into_list(context: &str, value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(Error::Deserialization {
            context: context.to_string(),
            source: SchemaError::mismatch("response", &FieldType::list(FieldType::Any), &other),
        }),
    }
}

impl Controller {
    async fn list(&self, path: &str, context: &str) -> Result<Vec<Value>> {
        into_list(context, self.get(path).await?)
    }

    async fn list_query(&self, path: &str, params: Params, context: &str) -> Result<Vec<Value>> {
        into_list(context, self.get_query(path, params).await?)
    }

    /// List boot resources.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unexpected`] on any failure, or
    /// [`Error::Deserialization`] if the response is not a list.
    pub async fn boot_resources(&self) -> Result<Vec<Value>> {
        self.list("boot-resources", "boot resources").await
    }

    /// List fabrics.
    ///
    /// # Errors
    ///
    /// See [`Controller::boot_resources`].
    pub async fn fabrics(&self) -> Result<Vec<Value>> {
        self.list("fabrics", "fabrics").await
    }

    /// List spaces.
    ///
    /// # Errors
    ///
    /// See [`Controller::boot_resources`].
    pub async fn spaces(&self) -> Result<Vec<Value>> {
        self.list("spaces", "spaces").await
    }

    /// List zones.
    ///
    /// # Errors
    ///
    /// See [`Controller::boot_resources`].
    pub async fn zones(&self) -> Result<Vec<Value>> {
        self.list("zones", "zones").await
    }

    /// List devices matching the filters.
    ///
    /// # Errors
    ///
    /// See [`Controller::boot_resources`].
    pub async fn devices(&self, args: &DevicesArgs) -> Result<Vec<Value>> {
        self.list_query("devices", args.params(), "devices").await
    }

    /// Create a device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] if no MAC address is given or the server
    /// rejects the request, otherwise [`Error::Unexpected`].
    pub async fn create_device(&self, args: &CreateDeviceArgs) -> Result<Value> {
        if args.mac_addresses.is_empty() {
            return Err(Error::bad_request(
                "at least one MAC address must be specified",
            ));
        }
        self.post("devices", "create", args.params())
            .await
            .map_err(|err| OperationClass::Creation.translate(err))
    }

    /// List machines matching the filters.
    ///
    /// # Errors
    ///
    /// See [`Controller::boot_resources`].
    pub async fn machines(&self, args: &MachinesArgs) -> Result<Vec<Value>> {
        self.list_query("machines", args.params(), "machines").await
    }

    /// Allocate a machine matching the constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoMatch`] if no machine satisfies the constraints,
    /// otherwise [`Error::Unexpected`].
    pub async fn allocate_machine(&self, args: &AllocateMachineArgs) -> Result<Value> {
        self.post("machines", "allocate", args.params())
            .await
            .map_err(|err| OperationClass::MachineAllocation.translate(err))
    }

    /// Release machines.
    ///
    /// # Errors
    ///
    /// - [`Error::BadRequest`] if a machine cannot be found
    /// - [`Error::PermissionDenied`] if the user may not release a machine
    /// - [`Error::CannotComplete`] if a machine's state forbids release
    /// - [`Error::Unexpected`] otherwise
    pub async fn release_machines(&self, args: &ReleaseMachinesArgs) -> Result<()> {
        self.post("machines", "release", args.params())
            .await
            .map(|_| ())
            .map_err(|err| OperationClass::MachineRelease.translate(err))
    }

    /// List stored files, optionally restricted to a name prefix.
    ///
    /// # Errors
    ///
    /// See [`Controller::boot_resources`].
    pub async fn files(&self, prefix: &str) -> Result<Vec<Value>> {
        let mut params = Params::new();
        params.maybe_add("prefix", prefix);
        self.list_query("files", params, "files").await
    }

    /// Fetch a stored file's metadata and content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] for an empty name, [`Error::NoMatch`] if no
    /// such file exists, otherwise [`Error::Unexpected`].
    pub async fn get_file(&self, filename: &str) -> Result<Value> {
        if filename.is_empty() {
            return Err(Error::NotValid("missing filename".to_string()));
        }
        self.get(&format!("files/{filename}"))
            .await
            .map_err(|err| OperationClass::FileFetch.translate(err))
    }

    /// Upload a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] for invalid arguments, [`Error::BadRequest`]
    /// if the server rejects the upload, otherwise [`Error::Unexpected`].
    pub async fn add_file(&self, args: AddFileArgs) -> Result<()> {
        let (filename, content) = args.into_upload().await?;
        let mut params = Params::new();
        params.add("filename", filename);
        self.post_file("files", "create", params, content)
            .await
            .map(|_| ())
            .map_err(|err| OperationClass::FileCreation.translate(err))
    }

    /// Delete a stored file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] for an empty name, otherwise
    /// [`Error::Unexpected`].
    pub async fn delete_file(&self, filename: &str) -> Result<()> {
        if filename.is_empty() {
            return Err(Error::NotValid("missing filename".to_string()));
        }
        self.delete(&format!("files/{filename}"))
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maas_core::ErrorKind;
    use serde_json::json;

    #[test]
    fn device_filters_skip_empty_fields() {
        let args = DevicesArgs {
            hostname: "edge-1".to_string(),
            mac_addresses: vec!["aa:bb".to_string(), "cc:dd".to_string()],
            ..DevicesArgs::default()
        };
        let params = args.params();
        assert_eq!(params.get_all("hostname"), vec!["edge-1"]);
        assert_eq!(params.get_all("mac_address"), vec!["aa:bb", "cc:dd"]);
        assert!(params.get_all("zone").is_empty());
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn machine_filters_repeat_hostnames() {
        let args = MachinesArgs {
            hostnames: vec!["a".to_string(), "b".to_string()],
            zone: "rack-2".to_string(),
            ..MachinesArgs::default()
        };
        assert_eq!(args.params().encode(), "hostname=a&hostname=b&zone=rack-2");
    }

    #[test]
    fn allocate_constraints_use_server_names() {
        let args = AllocateMachineArgs {
            hostname: "node-7".to_string(),
            architecture: "amd64/generic".to_string(),
            min_cpu_count: 4,
            min_memory: 0,
            not_in_zone: vec!["dmz".to_string()],
            dry_run: true,
            ..AllocateMachineArgs::default()
        };
        let params = args.params();
        assert_eq!(params.get_all("name"), vec!["node-7"]);
        assert_eq!(params.get_all("arch"), vec!["amd64/generic"]);
        assert_eq!(params.get_all("cpu_count"), vec!["4"]);
        assert!(params.get_all("mem").is_empty());
        assert_eq!(params.get_all("not_in_zone"), vec!["dmz"]);
        assert_eq!(params.get_all("dry_run"), vec!["true"]);
    }

    #[test]
    fn release_sends_machines_and_comment() {
        let args = ReleaseMachinesArgs {
            system_ids: vec!["abc".to_string(), "def".to_string()],
            comment: "done".to_string(),
        };
        assert_eq!(args.params().encode(), "machines=abc&machines=def&comment=done");
    }

    #[test]
    fn create_device_params() {
        let args = CreateDeviceArgs {
            hostname: "phone".to_string(),
            mac_addresses: vec!["aa:bb".to_string()],
            parent: "abc123".to_string(),
            ..CreateDeviceArgs::default()
        };
        assert_eq!(
            args.params().encode(),
            "hostname=phone&mac_addresses=aa%3Abb&parent=abc123"
        );
    }

    #[test]
    fn into_list_requires_array() {
        let items = into_list("zones", json!([{"name": "default"}])).unwrap();
        assert_eq!(items.len(), 1);

        let err = into_list("zones", json!({"name": "default"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(err.error_code(), "DESERIALIZATION");
        assert!(err.to_string().contains("zones"));
    }
}
