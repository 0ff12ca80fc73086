//! Kie, Teiid and SwitchYard archives ingested end to end.

use artificer::integration::{kie, switchyard, teiid};
use artificer::model::RELATED_DOCUMENT;
use artificer::{Artifact, ArtifactType, IdentityKey, Ingestor, Upload};

use crate::helpers::{class_file, registry, scoped_config, zip};

fn of_type<'a>(artifacts: impl Iterator<Item = &'a Artifact>, extended_type: &str) -> Vec<&'a Artifact> {
    artifacts
        .filter(|a| a.artifact_type.is_extended_type(extended_type))
        .collect()
}

const VDB_MANIFEST: &str = r#"<vdb name="Portfolio" version="1">
  <model name="MarketData" path="/Portfolio/MarketData.xmi">
    <source name="text" translator-name="file" connection-jndi-name="java:/market"/>
  </model>
  <translator name="file" type="file"/>
</vdb>"#;

const XMI: &str = r#"<xmi:XMI xmlns:xmi="http://www.omg.org/XMI" xmlns:mmcore="http://www.metamatrix.com/metamodels/Core">
  <mmcore:ModelAnnotation xmi:uuid="mmuuid:abc" modelType="PHYSICAL"/>
</xmi:XMI>"#;

#[test]
fn test_teiid_vdb_links_schema_to_model() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let bytes = zip(&[
        (teiid::MANIFEST_PATH, VDB_MANIFEST.as_bytes()),
        ("Portfolio/MarketData.xmi", XMI.as_bytes()),
        ("Portfolio/MarketData.INDEX", b"index"),
    ]);
    let ingest = Ingestor::new(&registry, &config)
        .ingest_archive(Upload::new("portfolio.vdb", bytes))
        .unwrap();

    assert_eq!(
        ingest.primary.primary.artifact_type,
        ArtifactType::extended_document(teiid::TEIID_VDB)
    );
    let paths: Vec<_> = ingest.container.entries().map(|e| e.path().to_string()).collect();
    assert_eq!(paths, vec![teiid::MANIFEST_PATH, "Portfolio/MarketData.xmi"]);

    let model = of_type(ingest.artifacts(), teiid::TEIID_MODEL)[0];
    assert_eq!(model.property("mmuuid"), Some("mmuuid:abc"));

    let schema = of_type(ingest.artifacts(), teiid::VDB_SCHEMA)[0];
    assert_eq!(schema.targets_of(teiid::SCHEMA_MODEL), vec![model.uuid()]);

    let manifest = of_type(ingest.artifacts(), teiid::VDB_MANIFEST)[0];
    assert_eq!(manifest.name, "Portfolio");
    assert_eq!(schema.targets_of(RELATED_DOCUMENT), vec![manifest.uuid()]);
    assert!(ingest.unresolved.is_empty(), "{:?}", ingest.unresolved);
}

const DESCRIPTOR: &str = r#"<switchyard xmlns="urn:switchyard-config:switchyard:1.0"
            xmlns:bean="urn:switchyard-component-bean:config:1.0"
            xmlns:sca="http://docs.oasis-open.org/ns/opencsa/sca/200912"
            name="orders" targetNamespace="urn:example:orders:1.0">
  <sca:composite name="orders" targetNamespace="urn:example:orders:1.0">
    <sca:component name="OrderBean">
      <bean:implementation.bean class="org.example.OrderBean"/>
      <sca:service name="OrderService">
        <sca:interface.java interface="org.example.OrderService"/>
      </sca:service>
    </sca:component>
  </sca:composite>
</switchyard>"#;

#[test]
fn test_switchyard_application_links_components_to_classes() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let bytes = zip(&[
        (switchyard::DESCRIPTOR_PATH, DESCRIPTOR.as_bytes()),
        ("org/example/OrderBean.class", &class_file("org/example/OrderBean", 0x0021)),
        ("org/example/OrderService.class", &class_file("org/example/OrderService", 0x0601)),
        ("org/example/Helper.class", &class_file("org/example/Helper", 0x0021)),
    ]);
    let ingest = Ingestor::new(&registry, &config)
        .ingest_archive(Upload::new("orders.jar", bytes))
        .unwrap();

    assert!(
        ingest
            .primary
            .primary
            .artifact_type
            .is_extended_type(switchyard::SWITCHYARD_APPLICATION)
    );
    assert!(!ingest.container.contains("org/example/Helper.class"));

    let bean = ingest
        .artifacts()
        .find(|a| a.name == "org.example.OrderBean")
        .unwrap();
    let service = ingest
        .artifacts()
        .find(|a| a.name == "org.example.OrderService")
        .unwrap();
    assert!(service.artifact_type.is_extended_type("JavaInterface"));

    let component = of_type(ingest.artifacts(), switchyard::COMPONENT)[0];
    assert_eq!(component.targets_of(switchyard::IMPLEMENTED_BY), vec![bean.uuid()]);
    let offered = of_type(ingest.artifacts(), switchyard::COMPONENT_SERVICE)[0];
    assert_eq!(offered.targets_of(switchyard::IMPLEMENTS), vec![service.uuid()]);
    assert!(
        ingest
            .unresolved
            .iter()
            .all(|r| r.key != IdentityKey::JavaClass("org.example.OrderBean".into()))
    );
}

#[test]
fn test_kie_archive_keeps_only_knowledge_resources() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let bytes = zip(&[
        (kie::KMODULE_PATH, b"<kmodule xmlns=\"http://www.drools.org/xsd/kmodule\"/>"),
        ("rules/discount.drl", b"rule \"discount\" end"),
        ("readme.txt", b"notes"),
    ]);
    let ingest = Ingestor::new(&registry, &config)
        .ingest_archive(Upload::new("rules.jar", bytes))
        .unwrap();

    let types: Vec<_> = ingest
        .entries
        .iter()
        .map(|e| e.primary.artifact_type.type_name().to_string())
        .collect();
    assert_eq!(types, vec![kie::KIE_XML_DOCUMENT, kie::DROOLS_DOCUMENT]);
    assert_eq!(ingest.container.len(), 2);
}
