//! Built-in resource hints and step graphs.
//!
//! Only plain metadata lives here. Strategies (custom discoverers,
//! post-processors, id generators and renderers) are attached by the
//! service modules in [`crate::services`].

use super::{QueryParam, RegistryBuilder, ResourceHint, StepBuilder, ROOT_CLASS};

const AVAILABLE: &[&str] = &["AVAILABLE"];
const ACTIVE: &[&str] = &["ACTIVE"];

/// Register every built-in hint and step.
pub fn register(builder: &mut RegistryBuilder) {
    for hint in hints() {
        builder.register(hint);
    }
    for step in steps() {
        builder.add_step(step);
    }
}

/// All built-in hints.
#[must_use]
pub fn hints() -> Vec<ResourceHint> {
    let mut hints = Vec::new();
    hints.extend(identity_hints());
    hints.extend(core_hints());
    hints.extend(database_hints());
    hints.extend(load_balancer_hints());
    hints.extend(object_storage_hints());
    hints.extend(container_engine_hints());
    hints.extend(health_checks_hints());
    hints
}

fn identity_hints() -> Vec<ResourceHint> {
    vec![
        ResourceHint::new(ROOT_CLASS, "compartment", "identity")
            .datasource("oci_identity_compartments", "compartments")
            .lifecycle_states(ACTIVE),
        ResourceHint::new("oci_identity_availability_domain", "availability_domain", "identity")
            .datasource("oci_identity_availability_domains", "availability_domains"),
        ResourceHint::new("oci_identity_authentication_policy", "authentication_policy", "identity")
            .datasource("oci_identity_authentication_policy", ""),
        ResourceHint::new("oci_identity_policy", "policy", "identity")
            .datasource("oci_identity_policies", "policies")
            .lifecycle_states(ACTIVE)
            .computed(&["inactive_state", "lifecycle_details", "ETag", "policy_hash"]),
        ResourceHint::new("oci_identity_tag_namespace", "tag_namespace", "identity")
            .datasource("oci_identity_tag_namespaces", "tag_namespaces")
            .lifecycle_states(ACTIVE),
        ResourceHint::new("oci_identity_tag", "tag", "identity")
            .datasource("oci_identity_tags", "tags")
            .lifecycle_states(ACTIVE)
            .computed(&["is_retired"]),
    ]
}

fn core_hints() -> Vec<ResourceHint> {
    vec![
        ResourceHint::new("oci_core_vcn", "vcn", "core")
            .datasource("oci_core_vcns", "virtual_networks")
            .lifecycle_states(AVAILABLE)
            .computed(&[
                "default_dhcp_options_id",
                "default_route_table_id",
                "default_security_list_id",
                "vcn_domain_name",
            ]),
        ResourceHint::new("oci_core_subnet", "subnet", "core")
            .datasource("oci_core_subnets", "subnets")
            .lifecycle_states(AVAILABLE)
            .computed(&["subnet_domain_name", "virtual_router_ip", "virtual_router_mac"]),
        ResourceHint::new("oci_core_security_list", "security_list", "core")
            .datasource("oci_core_security_lists", "security_lists")
            .lifecycle_states(AVAILABLE),
        ResourceHint::new("oci_core_route_table", "route_table", "core")
            .datasource("oci_core_route_tables", "route_tables")
            .lifecycle_states(AVAILABLE),
        ResourceHint::new("oci_core_dhcp_options", "dhcp_options", "core")
            .datasource("oci_core_dhcp_options", "options")
            .lifecycle_states(AVAILABLE),
        ResourceHint::new("oci_core_internet_gateway", "internet_gateway", "core")
            .datasource("oci_core_internet_gateways", "gateways")
            .lifecycle_states(AVAILABLE),
        ResourceHint::new("oci_core_nat_gateway", "nat_gateway", "core")
            .datasource("oci_core_nat_gateways", "nat_gateways")
            .lifecycle_states(AVAILABLE)
            .computed(&["nat_ip"]),
        ResourceHint::new("oci_core_service_gateway", "service_gateway", "core")
            .datasource("oci_core_service_gateways", "service_gateways")
            .lifecycle_states(AVAILABLE)
            .computed(&["block_traffic"]),
        ResourceHint::new("oci_core_local_peering_gateway", "local_peering_gateway", "core")
            .datasource("oci_core_local_peering_gateways", "local_peering_gateways")
            .lifecycle_states(AVAILABLE)
            .computed(&["is_cross_tenancy_peering", "peer_advertised_cidr", "peering_status", "peering_status_details"]),
        ResourceHint::new("oci_core_network_security_group", "network_security_group", "core")
            .datasource("oci_core_network_security_groups", "network_security_groups")
            .lifecycle_states(AVAILABLE),
        ResourceHint::new("oci_core_network_security_group_security_rule", "security_rule", "core")
            .datasource("oci_core_network_security_group_security_rules", "security_rules")
            .computed(&["is_valid"]),
        ResourceHint::new("oci_core_image", "image", "core")
            .datasource("oci_core_images", "images")
            .lifecycle_states(AVAILABLE)
            .computed(&["base_image_id", "billable_size_in_gbs", "create_image_allowed", "size_in_mbs"]),
        ResourceHint::new("oci_core_instance", "instance", "core")
            .datasource("oci_core_instances", "instances")
            .lifecycle_states(&["RUNNING", "STOPPED"])
            .refresh()
            .computed(&["boot_volume_id", "image", "private_ip", "public_ip", "region", "time_maintenance_reboot_due"]),
        ResourceHint::new("oci_core_vnic_attachment", "vnic_attachment", "core")
            .datasource("oci_core_vnic_attachments", "vnic_attachments")
            .lifecycle_states(&["ATTACHED"])
            .computed(&["vlan_tag"]),
        ResourceHint::new("oci_core_boot_volume", "boot_volume", "core")
            .datasource("oci_core_boot_volumes", "boot_volumes")
            .lifecycle_states(AVAILABLE)
            .computed(&["image_id", "is_hydrated", "size_in_mbs", "volume_group_id"]),
        ResourceHint::new("oci_core_volume", "volume", "core")
            .datasource("oci_core_volumes", "volumes")
            .lifecycle_states(AVAILABLE)
            .computed(&["is_hydrated", "size_in_mbs", "volume_group_id"]),
        ResourceHint::new("oci_core_volume_group", "volume_group", "core")
            .datasource("oci_core_volume_groups", "volume_groups")
            .lifecycle_states(AVAILABLE)
            .computed(&["is_hydrated", "size_in_gbs", "size_in_mbs", "volume_ids"]),
        ResourceHint::new("oci_core_drg", "drg", "core")
            .datasource("oci_core_drgs", "drgs")
            .lifecycle_states(AVAILABLE),
        ResourceHint::new("oci_core_cross_connect_group", "cross_connect_group", "core")
            .datasource("oci_core_cross_connect_groups", "cross_connect_groups")
            .lifecycle_states(&["PROVISIONED", "INACTIVE"]),
    ]
}

fn database_hints() -> Vec<ResourceHint> {
    vec![
        ResourceHint::new("oci_database_db_system", "db_system", "database")
            .datasource("oci_database_db_systems", "db_systems")
            .lifecycle_states(AVAILABLE)
            .refresh()
            .computed(&["last_patch_history_entry_id", "listener_port", "scan_dns_record_id", "version"]),
        ResourceHint::new("oci_database_db_home", "db_home", "database")
            .datasource("oci_database_db_homes", "db_homes")
            .lifecycle_states(AVAILABLE)
            .refresh()
            .computed(&["last_patch_history_entry_id"]),
        ResourceHint::new("oci_database_autonomous_database", "autonomous_database", "database")
            .datasource("oci_database_autonomous_databases", "autonomous_databases")
            .lifecycle_states(AVAILABLE)
            .refresh()
            .computed(&["connection_strings", "connection_urls", "service_console_url", "used_data_storage_size_in_tbs"]),
        ResourceHint::new(
            "oci_database_autonomous_container_database",
            "autonomous_container_database",
            "database",
        )
        .datasource("oci_database_autonomous_container_databases", "autonomous_container_databases")
        .lifecycle_states(AVAILABLE)
        .refresh()
        .computed(&["last_maintenance_run_id", "next_maintenance_run_id"]),
        ResourceHint::new(
            "oci_database_autonomous_exadata_infrastructure",
            "autonomous_exadata_infrastructure",
            "database",
        )
        .datasource(
            "oci_database_autonomous_exadata_infrastructures",
            "autonomous_exadata_infrastructures",
        )
        .lifecycle_states(AVAILABLE)
        .refresh()
        .computed(&["hostname", "last_maintenance_run_id", "next_maintenance_run_id"]),
    ]
}

fn load_balancer_hints() -> Vec<ResourceHint> {
    vec![
        ResourceHint::new("oci_load_balancer_load_balancer", "load_balancer", "load_balancer")
            .datasource("oci_load_balancer_load_balancers", "load_balancers")
            .lifecycle_states(ACTIVE)
            .computed(&["ip_address_details", "ip_addresses"]),
        ResourceHint::new("oci_load_balancer_backend_set", "backend_set", "load_balancer")
            .datasource("oci_load_balancer_backend_sets", "backendsets"),
        ResourceHint::new("oci_load_balancer_backend", "backend", "load_balancer")
            .datasource("oci_load_balancer_backends", "backends"),
        ResourceHint::new("oci_load_balancer_certificate", "certificate", "load_balancer")
            .datasource("oci_load_balancer_certificates", "certificates"),
        ResourceHint::new("oci_load_balancer_hostname", "hostname", "load_balancer")
            .datasource("oci_load_balancer_hostnames", "hostnames"),
        ResourceHint::new("oci_load_balancer_listener", "listener", "load_balancer")
            .datasource("oci_load_balancer_listeners", "listeners"),
        ResourceHint::new("oci_load_balancer_path_route_set", "path_route_set", "load_balancer")
            .datasource("oci_load_balancer_path_route_sets", "path_route_sets"),
        ResourceHint::new("oci_load_balancer_rule_set", "rule_set", "load_balancer")
            .datasource("oci_load_balancer_rule_sets", "rule_sets"),
    ]
}

fn object_storage_hints() -> Vec<ResourceHint> {
    vec![
        ResourceHint::new("oci_objectstorage_namespace", "namespace", "object_storage")
            .datasource("oci_objectstorage_namespace", ""),
        ResourceHint::new("oci_objectstorage_bucket", "bucket", "object_storage")
            .datasource("oci_objectstorage_bucket_summaries", "bucket_summaries")
            .refresh()
            .computed(&["approximate_count", "approximate_size", "bucket_id", "created_by", "etag", "object_lifecycle_policy_etag"]),
    ]
}

fn container_engine_hints() -> Vec<ResourceHint> {
    vec![
        ResourceHint::new("oci_containerengine_cluster", "cluster", "containerengine")
            .datasource("oci_containerengine_clusters", "clusters")
            .lifecycle_states(ACTIVE)
            .computed(&["available_kubernetes_upgrades", "endpoints", "metadata"]),
        ResourceHint::new("oci_containerengine_node_pool", "node_pool", "containerengine")
            .datasource("oci_containerengine_node_pools", "node_pools")
            .computed(&["node_source", "nodes"]),
    ]
}

fn health_checks_hints() -> Vec<ResourceHint> {
    vec![
        ResourceHint::new("oci_health_checks_http_monitor", "http_monitor", "health_checks")
            .datasource("oci_health_checks_http_monitors", "http_monitors")
            .computed(&["results_url"]),
        ResourceHint::new("oci_health_checks_ping_monitor", "ping_monitor", "health_checks")
            .datasource("oci_health_checks_ping_monitors", "ping_monitors")
            .computed(&["results_url"]),
    ]
}

/// Step graphs, in export order.
#[must_use]
pub fn steps() -> Vec<StepBuilder> {
    let from_id = |param: &'static str| (param, QueryParam::parent("id"));

    vec![
        StepBuilder::new("availability_domain").child(ROOT_CLASS, "oci_identity_availability_domain", &[]),
        StepBuilder::new("identity")
            .child(ROOT_CLASS, "oci_identity_authentication_policy", &[])
            .child(ROOT_CLASS, "oci_identity_policy", &[])
            .child(
                ROOT_CLASS,
                "oci_identity_tag_namespace",
                &[("include_subcompartments", QueryParam::fixed(false))],
            )
            .child("oci_identity_tag_namespace", "oci_identity_tag", &[from_id("tag_namespace_id")]),
        StepBuilder::new("core")
            .child(ROOT_CLASS, "oci_core_vcn", &[])
            .child("oci_core_vcn", "oci_core_security_list", &[from_id("vcn_id")])
            .child("oci_core_vcn", "oci_core_route_table", &[from_id("vcn_id")])
            .child("oci_core_vcn", "oci_core_dhcp_options", &[from_id("vcn_id")])
            .child("oci_core_vcn", "oci_core_subnet", &[from_id("vcn_id")])
            .child("oci_core_vcn", "oci_core_internet_gateway", &[from_id("vcn_id")])
            .child("oci_core_vcn", "oci_core_nat_gateway", &[from_id("vcn_id")])
            .child("oci_core_vcn", "oci_core_service_gateway", &[from_id("vcn_id")])
            .child("oci_core_vcn", "oci_core_local_peering_gateway", &[from_id("vcn_id")])
            .child("oci_core_vcn", "oci_core_network_security_group", &[from_id("vcn_id")])
            .child(
                "oci_core_network_security_group",
                "oci_core_network_security_group_security_rule",
                &[from_id("network_security_group_id")],
            )
            // Images before instances so image ids are resolvable
            .child(ROOT_CLASS, "oci_core_image", &[])
            .child(ROOT_CLASS, "oci_core_instance", &[])
            .child("oci_core_instance", "oci_core_vnic_attachment", &[from_id("instance_id")])
            .child(ROOT_CLASS, "oci_core_boot_volume", &[])
            .child(ROOT_CLASS, "oci_core_volume", &[])
            .child(ROOT_CLASS, "oci_core_volume_group", &[])
            .child(ROOT_CLASS, "oci_core_drg", &[])
            .child(ROOT_CLASS, "oci_core_cross_connect_group", &[]),
        StepBuilder::new("database")
            .child(ROOT_CLASS, "oci_database_db_system", &[])
            .child("oci_database_db_system", "oci_database_db_home", &[from_id("db_system_id")])
            .child(ROOT_CLASS, "oci_database_autonomous_exadata_infrastructure", &[])
            .child(ROOT_CLASS, "oci_database_autonomous_container_database", &[])
            .child(ROOT_CLASS, "oci_database_autonomous_database", &[]),
        StepBuilder::new("load_balancer")
            .child(ROOT_CLASS, "oci_load_balancer_load_balancer", &[])
            .child(
                "oci_load_balancer_load_balancer",
                "oci_load_balancer_backend_set",
                &[from_id("load_balancer_id")],
            )
            .child(
                "oci_load_balancer_backend_set",
                "oci_load_balancer_backend",
                &[
                    ("load_balancer_id", QueryParam::parent("load_balancer_id")),
                    ("backendset_name", QueryParam::parent("name")),
                ],
            )
            .child("oci_load_balancer_backend_set", "oci_load_balancer_listener", &[])
            .child(
                "oci_load_balancer_load_balancer",
                "oci_load_balancer_certificate",
                &[from_id("load_balancer_id")],
            )
            .child(
                "oci_load_balancer_load_balancer",
                "oci_load_balancer_hostname",
                &[from_id("load_balancer_id")],
            )
            .child(
                "oci_load_balancer_load_balancer",
                "oci_load_balancer_path_route_set",
                &[from_id("load_balancer_id")],
            )
            .child(
                "oci_load_balancer_load_balancer",
                "oci_load_balancer_rule_set",
                &[from_id("load_balancer_id")],
            ),
        StepBuilder::new("object_storage")
            .child(ROOT_CLASS, "oci_objectstorage_namespace", &[])
            .child(
                "oci_objectstorage_namespace",
                "oci_objectstorage_bucket",
                &[("namespace", QueryParam::parent("namespace"))],
            ),
        StepBuilder::new("containerengine")
            .child(ROOT_CLASS, "oci_containerengine_cluster", &[])
            .child("oci_containerengine_cluster", "oci_containerengine_node_pool", &[from_id("cluster_id")]),
        StepBuilder::new("health_checks")
            .child(ROOT_CLASS, "oci_health_checks_http_monitor", &[])
            .child(ROOT_CLASS, "oci_health_checks_ping_monitor", &[]),
    ]
}
