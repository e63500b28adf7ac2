#[cfg(test)]
mod tests {
    use std::fs;

    use approx::assert_relative_eq;
    use geo::Coord;
    use hydro_trace::{
        Config, DirectoryWorkspace, Error, GeoVectorOps, MemoryWorkspace, PixelCoord, Raster, Resolution,
        Termination, flow_path, upstream_area, write_raster,
    };
    use ndarray::{Array2, array};
    use tempfile::tempdir;

    fn towards_origin() -> Raster<u8> {
        Raster::from_array(
            array![
                [16, 16, 16, 16],
                [64, 32, 32, 32],
                [64, 32, 32, 32],
                [64, 32, 32, 32],
            ],
            0.0,
            4.0,
            1.0,
            1.0,
            255,
        )
        .expect("Failed to create raster")
    }

    fn memory_workspace() -> MemoryWorkspace {
        let accumulation = Raster::from_array(Array2::from_elem((4, 4), 100.0f64), 0.0, 4.0, 1.0, 1.0, -1.0).unwrap();
        let mut workspace = MemoryWorkspace::new();
        workspace.insert_raster("flow_direction", &towards_origin()).unwrap();
        workspace.insert_raster("flow_accumulation", &accumulation).unwrap();
        workspace
    }

    #[test]
    fn test_flow_path_with_defaults() {
        let workspace = memory_workspace();
        let path = flow_path(&workspace, &Config::default(), Coord { x: 3.5, y: 0.5 }).unwrap();
        assert_eq!(path.termination(), Termination::ExitedGrid);
        assert_eq!(
            path.points(),
            &[Coord { x: 3.5, y: 0.5 }, Coord { x: 0.5, y: 3.5 }, Coord { x: -0.5, y: 3.5 }]
        );
        assert_eq!(path.steps(), 4);
    }

    #[test]
    fn test_upstream_area_with_defaults() {
        let workspace = memory_workspace();
        let ws = upstream_area(&workspace, &Config::default(), &GeoVectorOps, Coord { x: 0.5, y: 3.5 }).unwrap();
        assert_eq!(ws.resolution, Resolution::Fallback);
        assert_eq!(ws.cell_count(), 16);
        assert_relative_eq!(ws.area(), 16.0);
    }

    fn single_row_workspace<T: hydro_trace::RasterValue>(codes: Array2<T>, nodata: T) -> MemoryWorkspace {
        let cols = codes.ncols();
        let flow = Raster::from_array(codes, 0.0, 1.0, 1.0, 1.0, nodata).unwrap();
        let accumulation = Raster::from_array(Array2::from_elem((1, cols), 1.0f64), 0.0, 1.0, 1.0, 1.0, -1.0).unwrap();
        let mut workspace = MemoryWorkspace::new();
        workspace.insert_raster("flow_direction", &flow).unwrap();
        workspace.insert_raster("flow_accumulation", &accumulation).unwrap();
        workspace
    }

    #[test]
    fn test_int16_flow_direction_with_negative_nodata() {
        let workspace = single_row_workspace(array![[1i16, 1, -32768]], -32768);
        let path = flow_path(&workspace, &Config::default(), Coord { x: 0.5, y: 0.5 }).unwrap();
        assert_eq!(path.termination(), Termination::NoData);
        assert_eq!(path.points(), &[Coord { x: 0.5, y: 0.5 }, Coord { x: 2.5, y: 0.5 }]);

        let ws = upstream_area(&workspace, &Config::default(), &GeoVectorOps, Coord { x: 1.5, y: 0.5 }).unwrap();
        assert_eq!(ws.cell_count(), 2);
        let nodata = upstream_area(&workspace, &Config::default(), &GeoVectorOps, Coord { x: 2.5, y: 0.5 });
        assert!(matches!(nodata, Err(Error::NoFlowData { pixel }) if pixel == PixelCoord::new(2, 0)));
    }

    #[test]
    fn test_out_of_set_codes_are_reported() {
        let workspace = single_row_workspace(array![[1i16, 300, 1]], -32768);
        let path = flow_path(&workspace, &Config::default(), Coord { x: 0.5, y: 0.5 }).unwrap();
        assert_eq!(
            path.termination(),
            Termination::InvalidDirectionCode { code: 300.0, pixel: PixelCoord::new(1, 0) }
        );

        let workspace = single_row_workspace(array![[16.5f32, 1.0, 1.0]], -1.0);
        let path = flow_path(&workspace, &Config::default(), Coord { x: 0.5, y: 0.5 }).unwrap();
        assert_eq!(
            path.termination(),
            Termination::InvalidDirectionCode { code: 16.5, pixel: PixelCoord::new(0, 0) }
        );
        assert!(matches!(path.ensure_complete(), Err(Error::InvalidDirectionCode { .. })));
    }

    #[test]
    fn test_missing_dataset() {
        let workspace = memory_workspace();
        let config = Config::from_json_str(r#"{ "flow_path": { "low_resolution_flow_direction": "nope" } }"#).unwrap();
        match flow_path(&workspace, &config, Coord { x: 0.5, y: 0.5 }) {
            Err(Error::DataUnavailable { name, .. }) => assert_eq!(name, "nope"),
            other => panic!("expected unavailable dataset, got {other:?}"),
        }

        let config = Config::from_json_str(r#"{ "upstream_area": { "flow_area": "lake", "flow_line": "river" } }"#).unwrap();
        let result = upstream_area(&workspace, &config, &GeoVectorOps, Coord { x: 0.5, y: 3.5 });
        assert!(matches!(result, Err(Error::DataUnavailable { .. })));
    }

    #[test]
    fn test_directory_workspace_end_to_end() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let workspace = DirectoryWorkspace::new(dir.path());

        let d8 = Raster::from_array(array![[1u8, 0, 0, 16]], 0.0, 1.0, 1.0, 1.0, 255)?;
        let accum = Raster::from_array(array![[1.0f32, 2.0, 2.0, 1.0]], 0.0, 1.0, 1.0, 1.0, -1.0)?;
        let lake = Raster::from_array(array![[1u8, 1, 0, 0]], 0.0, 1.0, 1.0, 1.0, 0)?;
        write_raster(&d8, &workspace.raster_path("flowdir"))?;
        write_raster(&accum, &workspace.raster_path("accum"))?;
        write_raster(&lake, &workspace.raster_path("lake"))?;
        fs::write(
            workspace.flow_line_path("river"),
            r#"{
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": {},
                    "geometry": { "type": "LineString", "coordinates": [[2.5, 0.0], [2.5, 1.0]] }
                }]
            }"#,
        )?;
        let config_path = dir.path().join("config.json");
        fs::write(
            &config_path,
            r#"{
                "flow_path": {
                    "low_resolution_flow_direction": "flowdir",
                    "low_res_max_steps": 10
                },
                "upstream_area": {
                    "flow_accumulation": "accum",
                    "high_resolution_flow_direction": "",
                    "low_resolution_flow_direction": "flowdir",
                    "flow_area": "lake",
                    "flow_line": "river"
                }
            }"#,
        )?;
        let config = Config::from_path(&config_path)?;
        assert!(config.upstream_area.high_resolution_flow_direction.is_empty());

        let ws = upstream_area(&workspace, &config, &GeoVectorOps, Coord { x: 1.5, y: 0.5 })?;
        assert_eq!(ws.snapped, Some(Coord { x: 2.5, y: 0.5 }));
        assert_eq!(ws.cell_count(), 4);
        assert_relative_eq!(ws.perimeter(), 10.0);

        let path = flow_path(&workspace, &config, Coord { x: 0.5, y: 0.5 })?;
        assert_eq!(path.points(), &[Coord { x: 0.5, y: 0.5 }, Coord { x: 1.5, y: 0.5 }]);
        assert_eq!(path.termination(), Termination::InvalidDirectionCode { code: 0.0, pixel: PixelCoord::new(1, 0) });
        Ok(())
    }

    #[test]
    fn test_int16_geotiff_flow_direction() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let workspace = DirectoryWorkspace::new(dir.path());
        let d8 = Raster::from_array(array![[1i16, 1, -32768]], 0.0, 1.0, 1.0, 1.0, -32768)?;
        write_raster(&d8, &workspace.raster_path("flow_direction"))?;

        let path = flow_path(&workspace, &Config::default(), Coord { x: 0.5, y: 0.5 })?;
        assert_eq!(path.termination(), Termination::NoData);
        assert_eq!(path.steps(), 2);
        Ok(())
    }
}
