//! GetCapabilities parsing.
//!
//! Parses the `Layer` hierarchy out of a WMS 1.1.1 or 1.3.0 capabilities
//! document into an owned [`ServiceDescription`] tree, decoupled from the
//! XML document's lifetime.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use harvest_common::{BoundingBox, CrsCode, HarvestError, HarvestResult};

use crate::exceptions;
use crate::tree::ServiceDescription;

/// Parsed capabilities: service metadata plus the advertised layer tree.
#[derive(Debug, Clone)]
pub struct WmsCapabilities {
    /// Service-level title from the Service section.
    pub service_title: String,

    /// Negotiated WMS version ("1.1.1" or "1.3.0").
    pub version: String,

    /// Root of the advertised layer hierarchy.
    pub root: ServiceDescription,
}

/// Which element's text content is currently being read.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TextTarget {
    None,
    ServiceTitle,
    LayerName,
    LayerTitle,
    LayerCrs,
    GeoBound(usize), // index into [west, east, south, north]
}

/// Parse a capabilities XML document.
///
/// A ServiceExceptionReport body is surfaced as
/// [`HarvestError::ServiceException`] rather than a parse failure.
pub fn parse_capabilities(xml: &str) -> HarvestResult<WmsCapabilities> {
    if let Some(err) = exceptions::detect(xml) {
        return Err(err);
    }

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();

    let mut service_title = String::new();
    let mut version = String::new();
    let mut root: Option<ServiceDescription> = None;

    // Layers currently open, outermost first.
    let mut stack: Vec<ServiceDescription> = Vec::new();
    let mut in_service = false;
    // Depth of Style/Attribution subtrees, whose Name/Title children must
    // not be read as layer fields.
    let mut skip_depth = 0usize;
    let mut target = TextTarget::None;
    let mut geo_bounds = [f64::NAN; 4];

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"WMS_Capabilities" | b"WMT_MS_Capabilities" => {
                    version = attribute_value(&e, b"version").unwrap_or_default();
                }
                b"Service" => in_service = true,
                b"Style" | b"Attribution" => skip_depth += 1,
                _ if skip_depth > 0 => {}
                b"Layer" => {
                    stack.push(ServiceDescription {
                        queryable: matches!(
                            attribute_value(&e, b"queryable").as_deref(),
                            Some("1") | Some("true")
                        ),
                        ..Default::default()
                    });
                }
                b"Name" if !stack.is_empty() => target = TextTarget::LayerName,
                b"Title" if !stack.is_empty() => target = TextTarget::LayerTitle,
                b"Title" if in_service => target = TextTarget::ServiceTitle,
                b"CRS" | b"SRS" if !stack.is_empty() => target = TextTarget::LayerCrs,
                b"LatLonBoundingBox" => apply_bbox_attributes(&e, stack.last_mut()),
                b"EX_GeographicBoundingBox" => geo_bounds = [f64::NAN; 4],
                b"westBoundLongitude" => target = TextTarget::GeoBound(0),
                b"eastBoundLongitude" => target = TextTarget::GeoBound(1),
                b"southBoundLatitude" => target = TextTarget::GeoBound(2),
                b"northBoundLatitude" => target = TextTarget::GeoBound(3),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                _ if skip_depth > 0 => {}
                b"LatLonBoundingBox" => apply_bbox_attributes(&e, stack.last_mut()),
                b"BoundingBox" => {
                    // Only taken when no geographic bound was advertised.
                    if stack.last().map_or(false, |l| l.bbox.is_none()) {
                        apply_bbox_attributes(&e, stack.last_mut());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) if target != TextTarget::None => {
                let text = t
                    .unescape()
                    .map_err(|e| HarvestError::CapabilitiesParse(e.to_string()))?
                    .into_owned();
                match (target, stack.last_mut()) {
                    (TextTarget::ServiceTitle, _) => service_title = text,
                    (TextTarget::LayerName, Some(layer)) => layer.name = text,
                    (TextTarget::LayerTitle, Some(layer)) => layer.title = text,
                    (TextTarget::LayerCrs, Some(layer)) => {
                        match CrsCode::from_wms_string(&text) {
                            Ok(code) => layer.crs.push(code),
                            Err(e) => debug!(crs = %text, error = %e, "Skipping unparseable CRS"),
                        }
                    }
                    (TextTarget::GeoBound(i), _) => {
                        geo_bounds[i] = text.parse().unwrap_or(f64::NAN);
                    }
                    _ => {}
                }
                target = TextTarget::None;
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"Style" | b"Attribution" => skip_depth = skip_depth.saturating_sub(1),
                _ if skip_depth > 0 => {}
                b"Service" => in_service = false,
                b"Layer" => {
                    let finished = stack.pop().ok_or_else(|| {
                        HarvestError::CapabilitiesParse("unbalanced Layer element".to_string())
                    })?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(finished),
                        None if root.is_none() => root = Some(finished),
                        None => {
                            return Err(HarvestError::CapabilitiesParse(
                                "multiple root Layer elements".to_string(),
                            ))
                        }
                    }
                }
                b"EX_GeographicBoundingBox" => {
                    if geo_bounds.iter().all(|v| v.is_finite()) {
                        if let Some(layer) = stack.last_mut() {
                            layer.bbox = Some(BoundingBox::new(
                                geo_bounds[0],
                                geo_bounds[2],
                                geo_bounds[1],
                                geo_bounds[3],
                            ));
                        }
                    }
                }
                _ => target = TextTarget::None,
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(HarvestError::CapabilitiesParse(format!(
                    "XML error at position {}: {:?}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    let root = root.ok_or_else(|| {
        HarvestError::CapabilitiesParse("no Layer element in capabilities".to_string())
    })?;

    Ok(WmsCapabilities {
        service_title,
        version,
        root,
    })
}

fn attribute_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        (attr.key.as_ref() == key).then(|| String::from_utf8_lossy(&attr.value).into_owned())
    })
}

fn apply_bbox_attributes(e: &BytesStart<'_>, layer: Option<&mut ServiceDescription>) {
    let Some(layer) = layer else { return };

    let get = |key: &[u8]| attribute_value(e, key).and_then(|v| v.parse::<f64>().ok());
    if let (Some(minx), Some(miny), Some(maxx), Some(maxy)) =
        (get(b"minx"), get(b"miny"), get(b"maxx"), get(b"maxy"))
    {
        layer.bbox = Some(BoundingBox::new(minx, miny, maxx, maxy));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::find_layer;

    const CAPS_130: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms">
  <Service>
    <Name>WMS</Name>
    <Title>Military Memorials</Title>
  </Service>
  <Capability>
    <Layer queryable="1">
      <Title>Service Layers</Title>
      <CRS>EPSG:4326</CRS>
      <CRS>EPSG:3857</CRS>
      <EX_GeographicBoundingBox>
        <westBoundLongitude>-141.0</westBoundLongitude>
        <eastBoundLongitude>-52.0</eastBoundLongitude>
        <southBoundLatitude>41.0</southBoundLatitude>
        <northBoundLatitude>84.0</northBoundLatitude>
      </EX_GeographicBoundingBox>
      <Layer>
        <Title>Memorials</Title>
        <Layer queryable="1">
          <Name>memorials_en</Name>
          <Title>Memorials (English)</Title>
          <Style>
            <Name>default</Name>
            <Title>Default style</Title>
          </Style>
        </Layer>
        <Layer>
          <Name>memorials_fr</Name>
          <Title>Memorials (French)</Title>
        </Layer>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;

    const CAPS_111: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMT_MS_Capabilities version="1.1.1">
  <Service>
    <Title>Legacy Service</Title>
  </Service>
  <Capability>
    <Layer>
      <Title>Root</Title>
      <SRS>EPSG:4326</SRS>
      <Layer queryable="1">
        <Name>roads</Name>
        <Title>Roads</Title>
        <LatLonBoundingBox minx="-120.5" miny="30.0" maxx="-100.0" maxy="49.5"/>
      </Layer>
    </Layer>
  </Capability>
</WMT_MS_Capabilities>"#;

    #[test]
    fn parses_wms_130_tree() {
        let caps = parse_capabilities(CAPS_130).unwrap();
        assert_eq!(caps.version, "1.3.0");
        assert_eq!(caps.service_title, "Military Memorials");

        let root = &caps.root;
        assert_eq!(root.title, "Service Layers");
        assert!(root.queryable);
        assert_eq!(root.crs.len(), 2);

        let bbox = root.bbox.unwrap();
        assert_eq!(bbox.min_x, -141.0);
        assert_eq!(bbox.max_y, 84.0);

        // One folder with two leaf layers underneath.
        assert_eq!(root.children.len(), 1);
        let group = &root.children[0];
        assert_eq!(group.title, "Memorials");
        assert_eq!(group.children.len(), 2);
        assert!(group.children.iter().all(|c| c.is_leaf()));
    }

    #[test]
    fn style_names_do_not_leak_into_layers() {
        let caps = parse_capabilities(CAPS_130).unwrap();
        let hit = find_layer(&caps.root, "memorials_en").unwrap();
        assert_eq!(hit.title, "Memorials (English)");
        // The Style block's Name ("default") must not be findable.
        assert!(find_layer(&caps.root, "default").is_none());
    }

    #[test]
    fn parses_wms_111_tree() {
        let caps = parse_capabilities(CAPS_111).unwrap();
        assert_eq!(caps.version, "1.1.1");

        let hit = find_layer(&caps.root, "roads").unwrap();
        assert!(hit.queryable);
        let bbox = hit.bbox.unwrap();
        assert_eq!(bbox.min_x, -120.5);
        assert_eq!(bbox.max_y, 49.5);
    }

    #[test]
    fn missing_layer_section_is_an_error() {
        let xml = r#"<WMS_Capabilities version="1.3.0"><Service><Title>t</Title></Service></WMS_Capabilities>"#;
        let err = parse_capabilities(xml).unwrap_err();
        assert!(matches!(err, HarvestError::CapabilitiesParse(_)));
    }

    #[test]
    fn exception_report_is_surfaced() {
        let xml = r#"<ServiceExceptionReport version="1.3.0">
  <ServiceException code="InvalidParameterValue">No such thing</ServiceException>
</ServiceExceptionReport>"#;
        let err = parse_capabilities(xml).unwrap_err();
        assert!(matches!(err, HarvestError::ServiceException { .. }));
    }
}
