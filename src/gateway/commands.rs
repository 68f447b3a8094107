//! The fixed set of management commands this core issues.

/// Liveness probe: reads the instance's `server-state` attribute.
pub const SERVER_STATE: &str = ":read-attribute(name=server-state)";

/// Recursive datasource listing for the datasources subsystem.
pub const DATASOURCES: &str = "/subsystem=datasources:read-resource(recursive=true)";

/// Recursive listing of every deployment.
pub const DEPLOYMENTS: &str = "/deployment=*:read-resource(recursive=true)";

/// Connection test for one named datasource. Exercises the pool, so it is
/// deliberately not a read-only command.
pub fn test_connection(datasource: &str) -> String {
    format!("/subsystem=datasources/data-source={datasource}:test-connection-in-pool")
}

/// Read-only commands are the only ones eligible for result caching.
pub fn is_read_only(command: &str) -> bool {
    command.contains(":read-attribute") || command.contains(":read-resource")
}
